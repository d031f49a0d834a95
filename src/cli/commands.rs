//! CLI command implementations
//!
//! Every command loads its [`ReadConfig`] first; `read` and `stream` then load
//! the dataset into an in-memory database and run the read against it.
//!
//! Partitions run on the tokio blocking pool, one task each. Ctrl-C cancels
//! the read through its snapshot coordinator, which wakes blocked partitions.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::runtime::Runtime;

use crate::config::ReadConfig;
use crate::executor::{PartitionReader, ReadError};
use crate::memory::{Dataset, MemoryDatabase};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::planner::{ExplainPlan, PlanAnalyzer};
use crate::scan::{InputPartition, Scan};
use crate::snapshot::SnapshotCoordinator;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_text, RowSink};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let severity = Severity::parse(&cli.log_level).ok_or_else(|| {
        CliError::config_error(format!(
            "Invalid log level: '{}'. Must be trace, info, warn or error.",
            cli.log_level
        ))
    })?;
    Logger::set_min_severity(severity);

    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Explain { config } => explain(&config),
        Command::Read { config } => read(&config),
        Command::Stream { config } => stream(&config),
    }
}

fn load_config(path: &Path) -> CliResult<ReadConfig> {
    let config = ReadConfig::load(path).map_err(|e| CliError::config_error(e.to_string()))?;

    let path_str = path.display().to_string();
    let partitions = config.num_partitions.to_string();
    let batch_size = config.batch_size.to_string();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("batch_size", batch_size.as_str()),
            ("partitions", partitions.as_str()),
            ("path", path_str.as_str()),
        ],
    );

    Ok(config)
}

fn load_database(config: &ReadConfig) -> CliResult<Arc<MemoryDatabase>> {
    let text = fs::read_to_string(&config.dataset).map_err(|e| {
        CliError::dataset_error(format!(
            "Failed to read dataset {}: {}",
            config.dataset.display(),
            e
        ))
    })?;
    let dataset = Dataset::from_json(&text)
        .map_err(|e| CliError::dataset_error(format!("Invalid dataset JSON: {}", e)))?;

    let path = config.dataset.display().to_string();
    let rows = dataset.row_count().to_string();
    let views = dataset.views.len().to_string();
    let database = dataset.database.clone();
    log_event_with_fields(
        Event::DatasetLoaded,
        &[
            ("database", database.as_str()),
            ("path", path.as_str()),
            ("rows", rows.as_str()),
            ("views", views.as_str()),
        ],
    );

    Ok(Arc::new(dataset.into_database()))
}

/// Plans the configured read against the dataset.
///
/// Fails before any bucket runs if the options, plan or database name are
/// invalid.
fn prepare(config_path: &Path) -> CliResult<Scan> {
    let config = load_config(config_path)?;
    let db = load_database(&config)?;
    let options = config.to_options()?;

    let scan = Scan::new(&options, db.clone(), db.clone())?;
    db.select_database(scan.context().connection().database())
        .map_err(ReadError::from)?;

    Ok(scan)
}

/// Print the partition layout of the configured plan
///
/// A rejected plan is printed with its error code and is not a CLI failure.
pub fn explain(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let plan = config.plan.as_ref().ok_or_else(|| {
        CliError::config_error("explain requires a plan; custom code reads have one partition")
    })?;

    let explain = match PlanAnalyzer::new().analyze_plan(
        plan,
        config.num_partitions,
        config.batch_size,
    ) {
        Ok(analysis) => ExplainPlan::from_analysis(&analysis),
        Err(err) => ExplainPlan::from_error(&err),
    };

    write_text(&explain.to_string())
}

/// Run a partitioned batch read, writing rows to stdout
pub fn read(config_path: &Path) -> CliResult<()> {
    let scan = prepare(config_path)?;
    let batch = scan.to_batch();

    let readers = batch
        .plan_input_partitions()
        .into_iter()
        .map(|partition| Ok((partition, batch.create_reader(&partition)?)))
        .collect::<Result<Vec<_>, ReadError>>()?;

    let sink = RowSink::stdout();
    let coordinator = Arc::clone(batch.context().coordinator());
    let runtime = new_runtime()?;
    let result = runtime.block_on(async {
        let interrupt = watch_interrupt(Arc::clone(&coordinator));
        let result = drain_all(readers, sink.clone()).await;
        interrupt.abort();
        result
    });

    sink.flush()?;
    batch.context().log_complete();
    result.map(|_| ())
}

/// Run the read as micro-batches of one partition each, writing rows to stdout
pub fn stream(config_path: &Path) -> CliResult<()> {
    let scan = prepare(config_path)?;
    let mut stream = scan.to_micro_batch_stream()?;

    let sink = RowSink::stdout();
    let coordinator = Arc::clone(stream.context().coordinator());
    let runtime = new_runtime()?;
    let result = runtime.block_on(async {
        let interrupt = watch_interrupt(Arc::clone(&coordinator));
        let mut start = stream.initial_offset();

        let result: CliResult<u64> = async {
            let mut total = 0;
            while !stream.is_exhausted() {
                let end = stream.latest_offset();
                let readers = stream
                    .plan_input_partitions(start, end)?
                    .into_iter()
                    .map(|partition| Ok((partition, stream.create_reader(&partition)?)))
                    .collect::<Result<Vec<_>, ReadError>>()?;

                total += drain_all(readers, sink.clone()).await?;
                stream.commit(end);
                start = end;
            }
            Ok(total)
        }
        .await;

        interrupt.abort();
        result
    });

    sink.flush()?;
    stream.context().log_complete();
    result.map(|_| ())
}

fn new_runtime() -> CliResult<Runtime> {
    Runtime::new()
        .map_err(|e| CliError::runtime_failed(format!("Failed to create tokio runtime: {}", e)))
}

fn watch_interrupt(coordinator: Arc<SnapshotCoordinator>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            coordinator.cancel();
        }
    })
}

/// Drains every reader on its own blocking task.
///
/// Returns the total row count, or the first partition failure in
/// partition order once every task has ended.
async fn drain_all(
    readers: Vec<(InputPartition, Box<dyn PartitionReader>)>,
    sink: RowSink,
) -> CliResult<u64> {
    let tasks = readers.into_iter().map(|(partition, reader)| {
        let sink = sink.clone();
        tokio::task::spawn_blocking(move || drain_partition(partition, reader, &sink))
    });

    let mut total = 0;
    let mut first_error = None;
    for joined in join_all(tasks).await {
        let outcome = joined
            .map_err(|e| CliError::runtime_failed(format!("Partition worker failed: {}", e)))
            .and_then(|result| result);
        match outcome {
            Ok(rows) => total += rows,
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(total),
    }
}

fn drain_partition(
    partition: InputPartition,
    mut reader: Box<dyn PartitionReader>,
    sink: &RowSink,
) -> CliResult<u64> {
    reader.open()?;

    let mut rows = 0;
    let result = loop {
        match reader.next_row() {
            Ok(Some(row)) => {
                if let Err(err) = sink.write_row(&row) {
                    break Err(err);
                }
                rows += 1;
            }
            Ok(None) => break Ok(rows),
            Err(err) => break Err(CliError::partition_failed(partition.index(), &err)),
        }
    };

    reader.close();
    result
}
