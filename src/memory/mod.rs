//! In-memory document database
//!
//! A process-local stand-in for the remote database: MVCC version chains,
//! point-in-time reads keyed by commit id, and a plan interpreter. It
//! implements both [`RowService`](crate::executor::RowService) and
//! [`CodeService`](crate::executor::CodeService).
//!
//! # Visibility
//!
//! A read at commit `c` sees, for each row, the version with the largest
//! commit id `<= c`, unless that version is a tombstone.

mod database;
mod dataset;
mod filters;
mod interpreter;
mod version;

pub use database::{MemoryDatabase, DEFAULT_DATABASE};
pub use dataset::{Dataset, DatasetView};
pub use filters::{PredicateFilter, RowSorter};
pub use interpreter::PlanInterpreter;
pub use version::{CommitId, ReadView, Version, VersionChain, VersionPayload};
