//! Snapshot consistency for partitioned reads
//!
//! A read observes exactly one point in time. The first bucket execution
//! establishes it; everything else binds it.
//!
//! - [`SnapshotTimestamp`]: opaque server value
//! - [`SnapshotCoordinator`]: set-once publication plus blocking waiters
//! - [`CancelToken`]: host-initiated cancellation

mod cancel;
mod coordinator;
mod timestamp;

pub use cancel::CancelToken;
pub use coordinator::{EstablishGuard, ReadState, SnapshotCoordinator, SnapshotLease};
pub use timestamp::SnapshotTimestamp;
