//! PartitionTask: sequential drain of one partition's buckets
//!
//! Execution flow per bucket (strict order):
//! 1. Bind the template to the bucket bounds
//! 2. Acquire the snapshot lease (establish, bind, or wait)
//! 3. Issue one remote call
//! 4. Publish the server timestamp if this call established it
//! 5. Discard the whole bucket if the read was cancelled meanwhile
//! 6. Convert every row through the emitter into the buffer
//!
//! A bucket's rows enter the buffer all at once or not at all. The first
//! failing bucket fails the task; there is no retry loop here.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::emitter::{ResultRowEmitter, Row};
use crate::observability::{log_event_with_fields, Event, Logger, ObservationScope, ReadMetrics};
use crate::planner::{BindParams, Bucket, Partition, PlanAnalysis};
use crate::snapshot::{SnapshotCoordinator, SnapshotLease, SnapshotTimestamp};

use super::errors::{ReadError, ReadResult};
use super::reader::PartitionReader;
use super::remote::{BucketRequest, RemoteError, RowBatch, RowService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Created,
    Open,
    Finished,
    Failed,
    Closed,
}

/// Reads one partition of a planned read.
pub struct PartitionTask {
    index: usize,
    partition: Partition,
    analysis: Arc<PlanAnalysis>,
    service: Arc<dyn RowService>,
    coordinator: Arc<SnapshotCoordinator>,
    emitter: ResultRowEmitter,
    metrics: Arc<ReadMetrics>,
    database: Option<String>,
    next_bucket: usize,
    buffer: VecDeque<Row>,
    rows_emitted: u64,
    state: TaskState,
    failure: Option<ReadError>,
    scope: Option<ObservationScope<'static>>,
}

impl PartitionTask {
    /// Creates the task for partition `index` of the analysis.
    pub fn new(
        analysis: Arc<PlanAnalysis>,
        index: usize,
        service: Arc<dyn RowService>,
        coordinator: Arc<SnapshotCoordinator>,
        emitter: ResultRowEmitter,
        metrics: Arc<ReadMetrics>,
    ) -> ReadResult<Self> {
        let partition = analysis.partition(index).cloned().ok_or_else(|| {
            ReadError::invalid_argument(format!(
                "Partition {} does not exist; read has {} partitions",
                index,
                analysis.partitions().len()
            ))
        })?;

        Ok(Self {
            index,
            partition,
            analysis,
            service,
            coordinator,
            emitter,
            metrics,
            database: None,
            next_bucket: 0,
            buffer: VecDeque::new(),
            rows_emitted: 0,
            state: TaskState::Created,
            failure: None,
            scope: None,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Runs every bucket in the named database instead of the server default
    pub fn in_database(mut self, database: Option<&str>) -> Self {
        self.database = database.map(str::to_string);
        self
    }

    fn execute_next_bucket(&mut self) -> ReadResult<()> {
        let bucket_index = self.next_bucket;
        let bucket = *self
            .partition
            .buckets()
            .get(bucket_index)
            .ok_or_else(|| ReadError::invalid_argument("bucket index out of range"))?;

        let params = self.analysis.template().bind(&bucket);
        let plan = self.analysis.template().plan();
        let cancel = self.coordinator.cancel_token();

        let batch = match self.coordinator.acquire()? {
            SnapshotLease::Establish(guard) => {
                let request = BucketRequest {
                    plan,
                    params: &params,
                    point_in_time: None,
                    cancel,
                    database: self.database.as_deref(),
                };
                // On any error the guard drops and releases the claim
                let batch = self.service.execute_plan(&request)?;
                let timestamp = batch
                    .server_timestamp
                    .clone()
                    .ok_or(RemoteError::MissingTimestamp)?;
                guard.publish(timestamp);
                batch
            }
            SnapshotLease::Bound { timestamp, waited } => {
                if waited {
                    self.metrics.increment_snapshot_waits();
                }
                self.execute_bound(&bucket, &params, &timestamp)?
            }
        };

        if self.coordinator.is_cancelled() {
            return Err(ReadError::Cancelled);
        }

        self.buffer_bucket(bucket_index, &bucket, batch);
        self.next_bucket += 1;
        Ok(())
    }

    fn execute_bound(
        &self,
        bucket: &Bucket,
        params: &BindParams,
        timestamp: &SnapshotTimestamp,
    ) -> ReadResult<RowBatch> {
        let request = BucketRequest {
            plan: self.analysis.template().plan(),
            params,
            point_in_time: Some(timestamp),
            cancel: self.coordinator.cancel_token(),
            database: self.database.as_deref(),
        };
        self.service.execute_plan(&request).map_err(|err| {
            let lower = bucket.lower_bound_param();
            let upper = bucket.upper_bound_param();
            let reason = err.to_string();
            Logger::trace(
                "BUCKET_ERROR",
                &[
                    ("lower", lower.as_str()),
                    ("reason", reason.as_str()),
                    ("upper", upper.as_str()),
                ],
            );
            ReadError::from(err)
        })
    }

    fn buffer_bucket(&mut self, bucket_index: usize, bucket: &Bucket, batch: RowBatch) {
        let row_count = batch.rows.len();

        for value in batch.rows {
            let raw = value.to_string();
            let row = self.emitter.emit(&raw);
            if row.is_corrupted() {
                self.metrics.increment_corrupted_records();
                let partition = self.index.to_string();
                log_event_with_fields(
                    Event::CorruptedRecord,
                    &[("partition", partition.as_str()), ("raw", raw.as_str())],
                );
            }
            self.buffer.push_back(row);
        }

        self.metrics.record_bucket(row_count as u64);
        if Logger::enabled(Event::BucketComplete.severity()) {
            let partition = self.index.to_string();
            let bucket_str = bucket_index.to_string();
            let rows = row_count.to_string();
            log_event_with_fields(
                Event::BucketComplete,
                &[
                    ("bucket", bucket_str.as_str()),
                    ("lower", bucket.lower_bound_param().as_str()),
                    ("partition", partition.as_str()),
                    ("rows", rows.as_str()),
                    ("upper", bucket.upper_bound_param().as_str()),
                ],
            );
        }
    }

    fn finish(&mut self) {
        self.state = TaskState::Finished;
        self.metrics.increment_partitions_completed();
        self.coordinator.mark_partition_done(self.index);

        if let Some(scope) = self.scope.take() {
            let rows = self.rows_emitted.to_string();
            scope.complete_with_fields(&[("rows", rows.as_str())]);
        }
    }

    fn fail(&mut self, err: &ReadError) {
        self.state = TaskState::Failed;
        self.failure = Some(err.clone());
        self.buffer.clear();
        self.metrics.increment_partitions_failed();

        let reason = err.to_string();
        match self.scope.take() {
            Some(scope) => scope.fail(err.code(), &reason),
            None => {
                let partition = self.index.to_string();
                log_event_with_fields(
                    Event::PartitionFailed,
                    &[
                        ("code", err.code()),
                        ("partition", partition.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
            }
        }
    }
}

impl PartitionReader for PartitionTask {
    fn open(&mut self) -> ReadResult<()> {
        match self.state {
            TaskState::Created => {
                let partition = self.index.to_string();
                let buckets = self.partition.len().to_string();
                let read_id = self.coordinator.read_id().to_string();
                self.scope = Some(ObservationScope::with_fields(
                    "PARTITION",
                    &[
                        ("buckets", buckets.as_str()),
                        ("partition", partition.as_str()),
                        ("read_id", read_id.as_str()),
                    ],
                ));
                self.state = TaskState::Open;
                Ok(())
            }
            TaskState::Closed => Err(ReadError::invalid_argument(format!(
                "Partition {} reader is closed",
                self.index
            ))),
            _ => Ok(()),
        }
    }

    fn has_next(&mut self) -> ReadResult<bool> {
        loop {
            match self.state {
                TaskState::Created => self.open()?,
                TaskState::Failed => {
                    return Err(self.failure.clone().unwrap_or(ReadError::Cancelled));
                }
                TaskState::Closed => {
                    return Err(ReadError::invalid_argument(format!(
                        "Partition {} reader is closed",
                        self.index
                    )));
                }
                TaskState::Finished => return Ok(!self.buffer.is_empty()),
                TaskState::Open => {
                    if !self.buffer.is_empty() {
                        return Ok(true);
                    }
                    if self.next_bucket >= self.partition.len() {
                        self.finish();
                        return Ok(false);
                    }
                    if let Err(err) = self.execute_next_bucket() {
                        self.fail(&err);
                        return Err(err);
                    }
                }
            }
        }
    }

    fn next_row(&mut self) -> ReadResult<Option<Row>> {
        if !self.has_next()? {
            return Ok(None);
        }
        let row = self.buffer.pop_front();
        if row.is_some() {
            self.rows_emitted += 1;
            self.metrics.increment_rows_emitted();
        }
        Ok(row)
    }

    fn close(&mut self) {
        self.buffer.clear();
        // An undrained scope logs PARTITION_INCOMPLETE on drop
        self.scope = None;
        self.state = TaskState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatabase;
    use crate::planner::{LogicalPlan, PlanAnalyzer};
    use crate::snapshot::SnapshotTimestamp;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn analysis(partitions: usize, batch: usize) -> Arc<PlanAnalysis> {
        let plan = LogicalPlan::from_view("Medical", "Authors");
        Arc::new(PlanAnalyzer::new().analyze_plan(&plan, partitions, batch).unwrap())
    }

    fn task(
        analysis: &Arc<PlanAnalysis>,
        index: usize,
        service: Arc<dyn RowService>,
        coordinator: &Arc<SnapshotCoordinator>,
    ) -> PartitionTask {
        PartitionTask::new(
            Arc::clone(analysis),
            index,
            service,
            Arc::clone(coordinator),
            ResultRowEmitter::passthrough(),
            Arc::new(ReadMetrics::new()),
        )
        .unwrap()
    }

    /// Records every request and fails on demand
    #[derive(Default)]
    struct RecordingService {
        seen: Mutex<Vec<Option<String>>>,
        fail_after: Option<usize>,
        omit_timestamp: bool,
    }

    impl RowService for RecordingService {
        fn execute_plan(&self, request: &BucketRequest<'_>) -> Result<RowBatch, RemoteError> {
            let mut seen = self.seen.lock().unwrap();
            if let Some(limit) = self.fail_after {
                if seen.len() >= limit {
                    return Err(RemoteError::unavailable("connection reset"));
                }
            }
            seen.push(request.point_in_time.map(|ts| ts.as_str().to_string()));

            let lower = request.params.get("AERO_LOWER_BOUND").unwrap();
            let ts = if self.omit_timestamp {
                None
            } else {
                Some(SnapshotTimestamp::new("ts-1"))
            };
            Ok(RowBatch::new(vec![json!({ "lower": lower })], ts))
        }
    }

    #[test]
    fn test_drains_every_bucket_in_order() {
        let analysis = analysis(1, 4);
        let coordinator = Arc::new(SnapshotCoordinator::new(Uuid::new_v4(), 1));
        let service = Arc::new(RecordingService::default());
        let mut reader = task(&analysis, 0, service.clone(), &coordinator);

        let rows = reader.read_all().unwrap();
        assert_eq!(rows.len(), 4);

        let seen = service.seen.lock().unwrap().clone();
        assert_eq!(seen[0], None);
        assert!(seen[1..].iter().all(|ts| ts.as_deref() == Some("ts-1")));
        assert_eq!(coordinator.timestamp().unwrap().as_str(), "ts-1");
    }

    #[test]
    fn test_bucket_failure_fails_task() {
        let analysis = analysis(1, 3);
        let coordinator = Arc::new(SnapshotCoordinator::new(Uuid::new_v4(), 1));
        let service = Arc::new(RecordingService {
            fail_after: Some(1),
            ..Default::default()
        });
        let mut reader = task(&analysis, 0, service, &coordinator);

        assert!(reader.has_next().unwrap());
        assert!(reader.next_row().unwrap().is_some());

        let err = reader.has_next().unwrap_err();
        assert_eq!(err.code(), "AERO_READ_REMOTE");
        assert!(reader.has_next().is_err());
    }

    #[test]
    fn test_missing_timestamp_releases_claim() {
        let analysis = analysis(1, 1);
        let coordinator = Arc::new(SnapshotCoordinator::new(Uuid::new_v4(), 1));
        let service = Arc::new(RecordingService {
            omit_timestamp: true,
            ..Default::default()
        });
        let mut reader = task(&analysis, 0, service, &coordinator);

        let err = reader.has_next().unwrap_err();
        assert!(matches!(
            err,
            ReadError::RemoteExecution(RemoteError::MissingTimestamp)
        ));
        assert!(coordinator.timestamp().is_none());
        assert_eq!(coordinator.state(), crate::snapshot::ReadState::Unstarted);
    }

    #[test]
    fn test_cancelled_read_emits_nothing() {
        let analysis = analysis(1, 2);
        let coordinator = Arc::new(SnapshotCoordinator::new(Uuid::new_v4(), 1));
        coordinator.cancel();
        let mut reader = task(&analysis, 0, Arc::new(RecordingService::default()), &coordinator);

        assert!(matches!(reader.has_next(), Err(ReadError::Cancelled)));
    }

    #[test]
    fn test_unknown_partition_rejected() {
        let analysis = analysis(2, 1);
        let coordinator = Arc::new(SnapshotCoordinator::new(Uuid::new_v4(), 2));
        let result = PartitionTask::new(
            analysis,
            2,
            Arc::new(MemoryDatabase::new()),
            coordinator,
            ResultRowEmitter::passthrough(),
            Arc::new(ReadMetrics::new()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_closed_reader_rejects_reads() {
        let analysis = analysis(1, 1);
        let coordinator = Arc::new(SnapshotCoordinator::new(Uuid::new_v4(), 1));
        let mut reader = task(&analysis, 0, Arc::new(RecordingService::default()), &coordinator);

        reader.close();
        assert!(reader.has_next().is_err());
        assert!(reader.open().is_err());
    }
}
