//! Server-assigned logical timestamps.

use serde::{Deserialize, Serialize};

/// Logical timestamp assigned by the store.
///
/// The store owns a monotonic sequence and ticks it once per write, so
/// timestamps double as a total order over writes observed by a single
/// subscription. Clients never fabricate timestamp values; they write
/// [`Timestamp::SERVER`] and let the store resolve it.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Write-time placeholder resolved by the store.
    ///
    /// Any timestamp field carrying this value is replaced with the store's
    /// clock when the write is applied. The sentinel itself never appears in
    /// a stored document.
    pub const SERVER: Timestamp = Timestamp(u64::MAX);

    /// Whether this value is the unresolved write-time sentinel.
    pub fn is_server_sentinel(self) -> bool {
        self == Self::SERVER
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_distinguishable() {
        assert!(Timestamp::SERVER.is_server_sentinel());
        assert!(!Timestamp(0).is_server_sentinel());
        assert!(!Timestamp(u64::MAX - 1).is_server_sentinel());
    }

    #[test]
    fn ordering_follows_sequence() {
        assert!(Timestamp(1) < Timestamp(2));
        assert!(Timestamp(2) < Timestamp::SERVER);
    }
}
