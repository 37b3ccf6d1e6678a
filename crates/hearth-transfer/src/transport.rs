//! Direct-transport boundary.
//!
//! The negotiation machines never touch the transport; these traits name
//! what the driver consumes from it. Session descriptions are opaque
//! serializable blobs produced and interpreted by the transport alone.
//! Candidate relay (ICE) is not part of this boundary: direct connections
//! either establish on their own or the transfer stalls.
//!
//! [`memory_pair`] provides a loopback implementation for tests and local
//! runs.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::chunker::Frame;
use crate::error::TransferError;

/// A direct peer connection under negotiation.
#[async_trait]
pub trait PeerConnection: Send {
    /// Produce the local session-description offer.
    async fn create_offer(&mut self) -> Result<String, TransferError>;

    /// Produce an answer from the peer's offer.
    async fn create_answer(&mut self, offer: &str) -> Result<String, TransferError>;

    /// Apply the peer's session description.
    async fn set_remote_description(&mut self, description: &str) -> Result<(), TransferError>;
}

/// An open, ordered, reliable frame channel between two peers.
#[async_trait]
pub trait DataChannel: Send {
    /// Send one frame.
    async fn send(&mut self, frame: Frame) -> Result<(), TransferError>;

    /// Receive the next frame; `None` once the peer closed.
    async fn recv(&mut self) -> Option<Frame>;
}

/// Loopback connection: descriptions are fixed strings, no network.
#[derive(Debug, Default)]
pub struct MemoryConnection {
    remote: Option<String>,
}

impl MemoryConnection {
    /// A connection with no remote description yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The applied remote description, if any.
    pub fn remote_description(&self) -> Option<&str> {
        self.remote.as_deref()
    }
}

#[async_trait]
impl PeerConnection for MemoryConnection {
    async fn create_offer(&mut self) -> Result<String, TransferError> {
        Ok("memory-offer".to_owned())
    }

    async fn create_answer(&mut self, offer: &str) -> Result<String, TransferError> {
        self.remote = Some(offer.to_owned());
        Ok("memory-answer".to_owned())
    }

    async fn set_remote_description(&mut self, description: &str) -> Result<(), TransferError> {
        self.remote = Some(description.to_owned());
        Ok(())
    }
}

/// Loopback frame channel half.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<Frame>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

/// Two connected loopback channel halves.
pub fn memory_pair() -> (MemoryChannel, MemoryChannel) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        MemoryChannel { tx: a_tx, rx: a_rx },
        MemoryChannel { tx: b_tx, rx: b_rx },
    )
}

#[async_trait]
impl DataChannel for MemoryChannel {
    async fn send(&mut self, frame: Frame) -> Result<(), TransferError> {
        self.tx
            .send(frame)
            .map_err(|_| TransferError::Transport("channel closed".to_owned()))
    }

    async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}
