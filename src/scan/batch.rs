//! Scan and ReadBatch: the host-facing entry points of a read

use std::fmt;
use std::sync::Arc;

use crate::config::ReadOptions;
use crate::executor::{CodeService, PartitionReader, ReadError, ReadResult, RowService};

use super::context::ReadContext;
use super::stream::MicroBatchStream;

/// One unit of parallel work handed to a host worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputPartition {
    index: usize,
    bucket_count: usize,
}

impl InputPartition {
    pub(crate) fn new(index: usize, bucket_count: usize) -> Self {
        Self {
            index,
            bucket_count,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Zero for custom code partitions
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }
}

impl fmt::Display for InputPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition {} ({} buckets)", self.index, self.bucket_count)
    }
}

pub(crate) fn input_partitions(context: &ReadContext) -> Vec<InputPartition> {
    match context.analysis() {
        Some(analysis) => analysis
            .partitions()
            .iter()
            .enumerate()
            .map(|(i, p)| InputPartition::new(i, p.len()))
            .collect(),
        None => vec![InputPartition::new(0, 0)],
    }
}

/// A validated, planned read.
///
/// Construction performs every check that can fail before the network:
/// options, connection descriptor, output schema and plan analysis.
#[derive(Clone)]
pub struct Scan {
    context: Arc<ReadContext>,
}

impl Scan {
    pub fn new(
        options: &ReadOptions,
        rows: Arc<dyn RowService>,
        code: Arc<dyn CodeService>,
    ) -> ReadResult<Self> {
        Ok(Self {
            context: Arc::new(ReadContext::new(options, rows, code)?),
        })
    }

    pub fn context(&self) -> &ReadContext {
        &self.context
    }

    /// Column names of the rows every reader produces
    pub fn read_schema(&self) -> Vec<String> {
        self.context
            .emitter()
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn description(&self) -> String {
        format!(
            "aeroscan {} read {} over {} ({} partitions)",
            self.context.source_kind(),
            self.context.read_id(),
            self.context.connection(),
            self.context.partition_count()
        )
    }

    /// Batch read over every partition at once
    pub fn to_batch(&self) -> ReadBatch {
        ReadBatch {
            context: Arc::clone(&self.context),
        }
    }

    /// Micro-batch read handing out one partition per batch.
    ///
    /// Only plan reads can be streamed.
    pub fn to_micro_batch_stream(&self) -> ReadResult<MicroBatchStream> {
        if self.context.analysis().is_none() {
            return Err(ReadError::invalid_argument(
                "Custom code reads cannot be streamed",
            ));
        }
        Ok(MicroBatchStream::new(Arc::clone(&self.context)))
    }
}

/// Batch read: all input partitions up front, one reader per partition
#[derive(Clone)]
pub struct ReadBatch {
    context: Arc<ReadContext>,
}

impl ReadBatch {
    pub fn context(&self) -> &ReadContext {
        &self.context
    }

    pub fn plan_input_partitions(&self) -> Vec<InputPartition> {
        input_partitions(&self.context)
    }

    pub fn create_reader(&self, partition: &InputPartition) -> ReadResult<Box<dyn PartitionReader>> {
        self.context.create_reader(partition.index())
    }

    /// Cancels the read, waking every blocked reader
    pub fn cancel(&self) {
        self.context.cancel();
    }
}
