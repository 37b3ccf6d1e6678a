//! Remote document store boundary.
//!
//! The hosted backend is consumed through one narrow interface: the
//! [`DocStore`] trait. It covers everything the sync layer needs: point
//! reads, merge writes, idempotent set-valued field mutations, auto-id
//! appends, change subscriptions, and the connection-lifecycle hook that
//! drives presence.
//!
//! [`MemoryStore`] is the in-process implementation used by tests and the
//! simulation harness. It is fully deterministic: a logical server clock
//! ticks once per write, subscriptions replay the current snapshot before
//! streaming deltas, and connectivity is driven manually.
//!
//! # Ordering guarantees
//!
//! Each subscription observes changes in server-assigned order. No ordering
//! is guaranteed *across* subscriptions; callers must not assume any.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod change;
mod error;
mod memory;
mod query;
mod store;
mod subscription;

pub use change::{ChangeBatch, ChangeKind, DocChange};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::Query;
pub use store::{ConnState, DocStore};
pub use subscription::{Subscription, UnsubscribeFn};
