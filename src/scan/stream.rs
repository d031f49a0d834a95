//! MicroBatchStream: a plan read handed out one partition per micro-batch
//!
//! Offsets are partition indices. The stream starts before partition 0
//! ([`PartitionOffset::INITIAL`]); every `latest_offset` call moves one
//! partition forward until the last one. A micro-batch `(start, end]` reads
//! the partitions after `start` up to and including `end`.
//!
//! Every micro-batch shares the read's snapshot coordinator, so the whole
//! stream observes the snapshot established by its first bucket.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::executor::{PartitionReader, ReadError, ReadResult};
use crate::observability::{log_event_with_fields, Event};

use super::batch::{input_partitions, InputPartition};
use super::context::ReadContext;

/// Position of a micro-batch stream, as the last partition index handed out
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionOffset(i64);

impl PartitionOffset {
    /// Before the first partition
    pub const INITIAL: PartitionOffset = PartitionOffset(-1);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Parses a checkpointed offset
    pub fn from_json(text: &str) -> ReadResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| ReadError::invalid_argument(format!("Invalid stream offset: {}", e)))
    }

    pub fn to_json(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for PartitionOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Streams the partitions of one read as successive micro-batches
pub struct MicroBatchStream {
    context: Arc<ReadContext>,
    partitions: Vec<InputPartition>,
    latest: PartitionOffset,
    committed: PartitionOffset,
}

impl MicroBatchStream {
    pub(crate) fn new(context: Arc<ReadContext>) -> Self {
        let partitions = input_partitions(&context);
        Self {
            context,
            partitions,
            latest: PartitionOffset::INITIAL,
            committed: PartitionOffset::INITIAL,
        }
    }

    pub fn context(&self) -> &ReadContext {
        &self.context
    }

    pub fn initial_offset(&self) -> PartitionOffset {
        PartitionOffset::INITIAL
    }

    /// Offset of the last partition
    pub fn final_offset(&self) -> PartitionOffset {
        PartitionOffset(self.partitions.len() as i64 - 1)
    }

    /// Advances by one partition, stopping at the last
    pub fn latest_offset(&mut self) -> PartitionOffset {
        if self.latest < self.final_offset() {
            self.latest = PartitionOffset(self.latest.0 + 1);
        }
        self.latest
    }

    pub fn is_exhausted(&self) -> bool {
        self.committed >= self.final_offset()
    }

    /// Partitions in `(start, end]`
    pub fn plan_input_partitions(
        &self,
        start: PartitionOffset,
        end: PartitionOffset,
    ) -> ReadResult<Vec<InputPartition>> {
        if start > end || end > self.final_offset() || start < PartitionOffset::INITIAL {
            return Err(ReadError::invalid_argument(format!(
                "Invalid micro-batch ({}, {}]; stream has {} partitions",
                start,
                end,
                self.partitions.len()
            )));
        }

        let from = (start.0 + 1) as usize;
        let to = (end.0 + 1) as usize;
        let batch = self.partitions[from..to].to_vec();

        let read_id = self.context.read_id().to_string();
        let start = start.to_string();
        let end = end.to_string();
        let count = batch.len().to_string();
        log_event_with_fields(
            Event::MicroBatchPlanned,
            &[
                ("end", end.as_str()),
                ("partitions", count.as_str()),
                ("read_id", read_id.as_str()),
                ("start", start.as_str()),
            ],
        );

        Ok(batch)
    }

    pub fn create_reader(&self, partition: &InputPartition) -> ReadResult<Box<dyn PartitionReader>> {
        self.context.create_reader(partition.index())
    }

    /// Records that every partition up to `end` has been consumed
    pub fn commit(&mut self, end: PartitionOffset) {
        if end > self.committed {
            self.committed = end;
        }
    }

    pub fn stop(&self) {
        self.context.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReadOptions, CLIENT_URI, READ_NUM_PARTITIONS, READ_PLAN};
    use crate::memory::MemoryDatabase;
    use crate::scan::Scan;
    use serde_json::json;

    fn stream(partitions: usize) -> MicroBatchStream {
        let db = Arc::new(MemoryDatabase::with_seed(3));
        db.insert_many(
            "Medical",
            "Authors",
            (0..10).map(|i| json!({ "id": i })).collect(),
        );
        let options = ReadOptions::new()
            .with(CLIENT_URI, "admin:admin@localhost:8000")
            .with(READ_PLAN, r#"{"source": {"schema": "Medical", "view": "Authors"}}"#)
            .with(READ_NUM_PARTITIONS, partitions.to_string());
        Scan::new(&options, db.clone(), db)
            .unwrap()
            .to_micro_batch_stream()
            .unwrap()
    }

    #[test]
    fn test_latest_offset_advances_one_partition() {
        let mut stream = stream(3);
        assert_eq!(stream.initial_offset().value(), -1);
        assert_eq!(stream.latest_offset().value(), 0);
        assert_eq!(stream.latest_offset().value(), 1);
        assert_eq!(stream.latest_offset().value(), 2);
        assert_eq!(stream.latest_offset().value(), 2);
    }

    #[test]
    fn test_micro_batches_cover_every_partition_once() {
        let mut stream = stream(4);
        let mut start = stream.initial_offset();
        let mut seen = Vec::new();
        let mut rows = 0;

        while !stream.is_exhausted() {
            let end = stream.latest_offset();
            for partition in stream.plan_input_partitions(start, end).unwrap() {
                seen.push(partition.index());
                rows += stream.create_reader(&partition).unwrap().read_all().unwrap().len();
            }
            stream.commit(end);
            start = end;
        }

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(rows, 10);
    }

    #[test]
    fn test_wider_batch_and_bad_ranges() {
        let stream = stream(3);
        let all = stream
            .plan_input_partitions(PartitionOffset::INITIAL, PartitionOffset::new(2))
            .unwrap();
        assert_eq!(all.len(), 3);

        assert!(stream
            .plan_input_partitions(PartitionOffset::new(1), PartitionOffset::new(0))
            .is_err());
        assert!(stream
            .plan_input_partitions(PartitionOffset::INITIAL, PartitionOffset::new(3))
            .is_err());
    }

    #[test]
    fn test_offset_json() {
        assert_eq!(PartitionOffset::from_json("4").unwrap(), PartitionOffset::new(4));
        assert_eq!(PartitionOffset::new(-1).to_json(), "-1");
        assert!(PartitionOffset::from_json("\"x\"").is_err());
    }
}
