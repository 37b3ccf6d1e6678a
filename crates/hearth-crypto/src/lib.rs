//! Passphrase-based message encryption.
//!
//! Opt-in helper consumed by the UI layer: messages can be sealed with a
//! room passphrase before being written to the store, and opened again by
//! anyone holding the same passphrase. The feed itself never calls
//! [`open`]; encrypted records render as a placeholder until the user
//! explicitly decrypts them.
//!
//! The key-derivation constants ([`PBKDF2_ITERATIONS`], [`KDF_SALT`]) are
//! part of the stored-ciphertext format. Changing either breaks decryption
//! of every previously stored message, so they are fixed here and must stay
//! bit-exact.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use thiserror::Error;

/// PBKDF2-HMAC-SHA256 iteration count. Part of the ciphertext format.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Fixed key-derivation salt. Part of the ciphertext format.
///
/// A fixed salt trades rainbow-table resistance for the ability to derive
/// the same key on every client without storing per-message salts; this
/// mirrors the deployed format and cannot change without orphaning stored
/// ciphertexts.
pub const KDF_SALT: &[u8] = b"hearth-chat-kdf-v1";

/// Nonce length for AES-256-GCM, in bytes.
pub const IV_LEN: usize = 12;

/// A sealed message as stored in the message document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Base64-encoded AES-256-GCM ciphertext (tag appended).
    pub ciphertext: String,
    /// The 96-bit nonce used for this message.
    pub iv: [u8; IV_LEN],
}

/// Errors from sealing or opening envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Ciphertext was not valid base64.
    #[error("ciphertext is not valid base64: {0}")]
    Encoding(String),

    /// Authentication failed: wrong passphrase or tampered ciphertext.
    #[error("decryption failed (wrong passphrase or corrupted message)")]
    Open,

    /// Decrypted bytes were not valid UTF-8.
    #[error("decrypted message is not valid UTF-8")]
    Utf8,
}

/// Derive the AES-256 key for `passphrase`.
fn derive_key(passphrase: &str) -> Key<Aes256Gcm> {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(
        passphrase.as_bytes(),
        KDF_SALT,
        PBKDF2_ITERATIONS,
        &mut key,
    );
    key.into()
}

/// Seal `plaintext` under `passphrase` with a fresh random nonce.
pub fn seal(plaintext: &str, passphrase: &str) -> Result<Envelope, CryptoError> {
    let key = derive_key(passphrase);
    let cipher = Aes256Gcm::new(&key);

    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| CryptoError::Open)?;

    Ok(Envelope {
        ciphertext: BASE64.encode(ciphertext),
        iv,
    })
}

/// Open a sealed envelope with `passphrase`.
pub fn open(envelope: &Envelope, passphrase: &str) -> Result<String, CryptoError> {
    let key = derive_key(passphrase);
    let cipher = Aes256Gcm::new(&key);

    let ciphertext = BASE64
        .decode(&envelope.ciphertext)
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&envelope.iv), ciphertext.as_ref())
        .map_err(|_| CryptoError::Open)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::{CryptoError, Envelope, open, seal};

    #[test]
    fn seal_open_roundtrip() {
        let envelope = seal("meet at noon", "hunter2").unwrap();
        assert_ne!(envelope.ciphertext, "meet at noon");
        assert_eq!(open(&envelope, "hunter2").unwrap(), "meet at noon");
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let envelope = seal("meet at noon", "hunter2").unwrap();
        assert_eq!(open(&envelope, "hunter3"), Err(CryptoError::Open));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let mut envelope = seal("meet at noon", "hunter2").unwrap();
        envelope.ciphertext = envelope.ciphertext.to_lowercase();
        assert!(open(&envelope, "hunter2").is_err());
    }

    #[test]
    fn invalid_base64_is_reported_as_encoding_error() {
        let envelope = Envelope {
            ciphertext: "not base64 !!!".into(),
            iv: [0u8; 12],
        };
        assert!(matches!(
            open(&envelope, "hunter2"),
            Err(CryptoError::Encoding(_))
        ));
    }

    proptest! {
        #[test]
        fn roundtrip_arbitrary_text(text in ".*", passphrase in "[a-z]{1,16}") {
            let envelope = seal(&text, &passphrase).unwrap();
            prop_assert_eq!(open(&envelope, &passphrase).unwrap(), text);
        }
    }
}
