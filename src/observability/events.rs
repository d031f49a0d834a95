//! Observable events of the read path
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events of a partitioned read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Read configuration loaded
    ConfigLoaded,
    /// In-memory dataset loaded
    DatasetLoaded,

    // Planning
    /// Plan analyzed into partitions
    ReadPlanned,
    /// Plan rejected before execution
    ReadRejected,

    // Snapshot
    /// A bucket execution claimed the establishing role
    SnapshotClaimed,
    /// Snapshot timestamp published
    SnapshotEstablished,
    /// Establishing call failed, claim released
    SnapshotClaimReleased,
    /// Read cancelled, waiters woken
    ReadCancelled,

    // Execution
    /// One bucket drained
    BucketComplete,
    /// Partition task failed
    PartitionFailed,
    /// Every partition finished
    ReadComplete,

    // Emission
    /// Raw value could not be projected into the output schema
    CorruptedRecord,

    // Custom code
    /// Server-side code invoked
    CodeInvoked,

    // Streaming
    /// Micro-batch planned
    MicroBatchPlanned,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DatasetLoaded => "DATASET_LOADED",

            Event::ReadPlanned => "READ_PLANNED",
            Event::ReadRejected => "READ_REJECTED",

            Event::SnapshotClaimed => "SNAPSHOT_CLAIMED",
            Event::SnapshotEstablished => "SNAPSHOT_ESTABLISHED",
            Event::SnapshotClaimReleased => "SNAPSHOT_CLAIM_RELEASED",
            Event::ReadCancelled => "READ_CANCELLED",

            Event::BucketComplete => "BUCKET_COMPLETE",
            Event::PartitionFailed => "PARTITION_FAILED",
            Event::ReadComplete => "READ_COMPLETE",

            Event::CorruptedRecord => "CORRUPTED_RECORD",

            Event::CodeInvoked => "CODE_INVOKED",

            Event::MicroBatchPlanned => "MICRO_BATCH_PLANNED",
        }
    }

    /// Returns the severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::BucketComplete | Event::SnapshotClaimed => Severity::Trace,
            Event::CorruptedRecord | Event::SnapshotClaimReleased | Event::ReadCancelled => {
                Severity::Warn
            }
            Event::ReadRejected | Event::PartitionFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::DatasetLoaded,
            Event::ReadPlanned,
            Event::ReadRejected,
            Event::SnapshotClaimed,
            Event::SnapshotEstablished,
            Event::SnapshotClaimReleased,
            Event::ReadCancelled,
            Event::BucketComplete,
            Event::PartitionFailed,
            Event::ReadComplete,
            Event::CorruptedRecord,
            Event::CodeInvoked,
            Event::MicroBatchPlanned,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::BucketComplete.severity(), Severity::Trace);
        assert_eq!(Event::SnapshotEstablished.severity(), Severity::Info);
        assert_eq!(Event::CorruptedRecord.severity(), Severity::Warn);
        assert_eq!(Event::PartitionFailed.severity(), Severity::Error);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::ReadPlanned), "READ_PLANNED");
    }
}
