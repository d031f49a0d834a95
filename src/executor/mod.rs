//! Partitioned read execution
//!
//! Runs the buckets of each partition against the remote database and turns
//! the results into engine rows.
//!
//! # Execution Flow
//!
//! 1. The host opens one reader per input partition
//! 2. Each reader drains its buckets strictly in order
//! 3. Every bucket execution goes through the snapshot coordinator
//! 4. Rows leave a reader only once their whole bucket has arrived
//!
//! # Guarantees
//!
//! - One snapshot per read
//! - Every matching row exactly once across all partitions
//! - Failures are scoped to the partition that hit them

mod custom_code;
mod errors;
mod reader;
mod remote;
mod task;

pub use custom_code::CustomCodeReader;
pub use errors::{ErrorScope, ReadError, ReadResult};
pub use reader::PartitionReader;
pub use remote::{
    BucketRequest, CodeCall, CodeService, CodeSource, RemoteError, RowBatch, RowService,
};
pub use task::PartitionTask;
