//! Per-read state shared by every reader a scan hands out

use std::sync::Arc;

use uuid::Uuid;

use crate::config::{ConnectionDescriptor, ReadOptions, ReadSource};
use crate::emitter::ResultRowEmitter;
use crate::executor::{
    CodeCall, CodeService, CustomCodeReader, PartitionReader, PartitionTask, ReadError,
    ReadResult, RowService,
};
use crate::observability::{log_event_with_fields, Event, ReadMetrics};
use crate::planner::{PlanAnalysis, PlanAnalyzer};
use crate::snapshot::SnapshotCoordinator;

/// What the readers of this read execute
#[derive(Debug, Clone)]
pub enum ScanSource {
    Plan(Arc<PlanAnalysis>),
    Code(CodeCall),
}

/// Everything decided once per read.
///
/// Built before any remote call; every validation and planning failure
/// surfaces here.
pub struct ReadContext {
    read_id: Uuid,
    connection: ConnectionDescriptor,
    source: ScanSource,
    emitter: ResultRowEmitter,
    coordinator: Arc<SnapshotCoordinator>,
    metrics: Arc<ReadMetrics>,
    rows: Arc<dyn RowService>,
    code: Arc<dyn CodeService>,
}

impl ReadContext {
    pub fn new(
        options: &ReadOptions,
        rows: Arc<dyn RowService>,
        code: Arc<dyn CodeService>,
    ) -> ReadResult<Self> {
        let read_id = Uuid::new_v4();
        match Self::build(read_id, options, rows, code) {
            Ok(context) => Ok(context),
            Err(err) => {
                let read_id = read_id.to_string();
                let reason = err.to_string();
                log_event_with_fields(
                    Event::ReadRejected,
                    &[
                        ("code", err.code()),
                        ("read_id", read_id.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
                Err(err)
            }
        }
    }

    fn build(
        read_id: Uuid,
        options: &ReadOptions,
        rows: Arc<dyn RowService>,
        code: Arc<dyn CodeService>,
    ) -> ReadResult<Self> {
        let connection = options.connection()?;
        let partition_count = options.partition_count()?;
        let batch_size = options.batch_size()?;
        let emitter = ResultRowEmitter::new(options.output_schema()?);

        let source = match options.read_source()? {
            ReadSource::Plan(plan) => {
                let analysis = PlanAnalyzer::new().analyze_plan(&plan, partition_count, batch_size)?;
                ScanSource::Plan(Arc::new(analysis))
            }
            ReadSource::Code(call) => ScanSource::Code(call.in_database(connection.database())),
        };

        let reader_count = match &source {
            ScanSource::Plan(analysis) => analysis.partitions().len(),
            ScanSource::Code(_) => 1,
        };

        let context = Self {
            read_id,
            connection,
            source,
            emitter,
            coordinator: Arc::new(SnapshotCoordinator::new(read_id, reader_count)),
            metrics: Arc::new(ReadMetrics::new()),
            rows,
            code,
        };

        let read_id = read_id.to_string();
        let partitions = context.partition_count().to_string();
        let buckets = context.bucket_count().to_string();
        let kind = context.source_kind();
        log_event_with_fields(
            Event::ReadPlanned,
            &[
                ("buckets", buckets.as_str()),
                ("partitions", partitions.as_str()),
                ("read_id", read_id.as_str()),
                ("source", kind),
            ],
        );

        Ok(context)
    }

    pub fn read_id(&self) -> Uuid {
        self.read_id
    }

    pub fn connection(&self) -> &ConnectionDescriptor {
        &self.connection
    }

    pub fn source(&self) -> &ScanSource {
        &self.source
    }

    /// `plan` or `code`
    pub fn source_kind(&self) -> &'static str {
        match self.source {
            ScanSource::Plan(_) => "plan",
            ScanSource::Code(_) => "code",
        }
    }

    pub fn analysis(&self) -> Option<&Arc<PlanAnalysis>> {
        match &self.source {
            ScanSource::Plan(analysis) => Some(analysis),
            ScanSource::Code(_) => None,
        }
    }

    pub fn emitter(&self) -> &ResultRowEmitter {
        &self.emitter
    }

    pub fn coordinator(&self) -> &Arc<SnapshotCoordinator> {
        &self.coordinator
    }

    pub fn metrics(&self) -> &Arc<ReadMetrics> {
        &self.metrics
    }

    /// Server-side code always runs as a single partition
    pub fn partition_count(&self) -> usize {
        match &self.source {
            ScanSource::Plan(analysis) => analysis.partitions().len(),
            ScanSource::Code(_) => 1,
        }
    }

    pub fn bucket_count(&self) -> usize {
        match &self.source {
            ScanSource::Plan(analysis) => analysis.bucket_count(),
            ScanSource::Code(_) => 0,
        }
    }

    /// Creates the reader for partition `index`
    pub fn create_reader(&self, index: usize) -> ReadResult<Box<dyn PartitionReader>> {
        match &self.source {
            ScanSource::Plan(analysis) => Ok(Box::new(PartitionTask::new(
                Arc::clone(analysis),
                index,
                Arc::clone(&self.rows),
                Arc::clone(&self.coordinator),
                self.emitter.clone(),
                Arc::clone(&self.metrics),
            )?
            .in_database(self.connection.database()))),
            ScanSource::Code(call) => {
                if index != 0 {
                    return Err(ReadError::invalid_argument(format!(
                        "Partition {} does not exist; custom code reads have 1 partition",
                        index
                    )));
                }
                Ok(Box::new(CustomCodeReader::new(
                    Arc::clone(&self.code),
                    call.clone(),
                    self.emitter.clone(),
                    Arc::clone(&self.metrics),
                    self.coordinator.cancel_token().clone(),
                )))
            }
        }
    }

    /// Cancels every reader of this read, waking blocked ones
    pub fn cancel(&self) {
        self.coordinator.cancel();
    }

    /// Logs READ_COMPLETE with the read's counters
    pub fn log_complete(&self) {
        let read_id = self.read_id.to_string();
        let state = self.coordinator.state();
        let snapshot = self.metrics.snapshot();
        let timestamp = self
            .coordinator
            .timestamp()
            .map(|ts| ts.as_str().to_string())
            .unwrap_or_default();

        let counters = snapshot.to_fields();
        let mut fields: Vec<(&str, &str)> = counters
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        fields.push(("read_id", read_id.as_str()));
        fields.push(("state", state.as_str()));
        fields.push(("timestamp", timestamp.as_str()));

        log_event_with_fields(Event::ReadComplete, &fields);
    }
}
