//! Fuzz target for envelope decryption.
//!
//! Ciphertexts come from untrusted stored messages; opening a corrupted or
//! hostile envelope must fail cleanly, never panic.

#![no_main]

use hearth_crypto::{open, Envelope, IV_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < IV_LEN {
        return;
    }
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&data[..IV_LEN]);
    let envelope = Envelope {
        ciphertext: String::from_utf8_lossy(&data[IV_LEN..]).into_owned(),
        iv,
    };
    let _ = open(&envelope, "fuzz-passphrase");
});
