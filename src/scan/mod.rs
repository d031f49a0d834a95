//! Host-facing read entry points
//!
//! A [`Scan`] validates options and plans the read once. From it a host gets
//! either a [`ReadBatch`] (every partition at once) or a [`MicroBatchStream`]
//! (partitions in successive micro-batches). Both hand out one
//! [`PartitionReader`](crate::executor::PartitionReader) per input partition,
//! all sharing one snapshot coordinator.

mod batch;
mod context;
mod stream;

pub use batch::{InputPartition, ReadBatch, Scan};
pub use context::{ReadContext, ScanSource};
pub use stream::{MicroBatchStream, PartitionOffset};
