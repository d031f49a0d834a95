//! Read configuration file used by the command line
//!
//! ```json
//! {
//!   "uri": "admin:admin@localhost:8000",
//!   "dataset": "authors.json",
//!   "plan": {"source": {"schema": "Medical", "view": "Authors"}},
//!   "numPartitions": 4,
//!   "batchSize": 2
//! }
//! ```
//!
//! A relative dataset path is resolved against the config file's directory.
//! The file is converted into [`ReadOptions`] so the command line takes the
//! same validation path as any other host.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::emitter::OutputSchema;
use crate::executor::{ReadError, ReadResult};
use crate::planner::LogicalPlan;

use super::options::{
    ReadOptions, CLIENT_URI, DEFAULT_BATCH_SIZE, DEFAULT_NUM_PARTITIONS, READ_BATCH_SIZE,
    READ_INVOKE, READ_NUM_PARTITIONS, READ_PLAN, READ_SCHEMA, READ_SCRIPT, READ_VARS_PREFIX,
};

fn default_num_partitions() -> usize {
    DEFAULT_NUM_PARTITIONS
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Contents of a read configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReadConfig {
    /// Connection descriptor
    pub uri: String,

    /// Dataset file loaded into the in-memory database
    pub dataset: PathBuf,

    #[serde(default)]
    pub plan: Option<LogicalPlan>,

    /// Server-side module path
    #[serde(default)]
    pub invoke: Option<String>,

    /// Inline server-side source
    #[serde(default)]
    pub script: Option<String>,

    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    #[serde(default = "default_num_partitions")]
    pub num_partitions: usize,

    /// Buckets per partition
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub schema: Option<OutputSchema>,
}

impl ReadConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ReadResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReadError::invalid_argument(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config: ReadConfig = serde_json::from_str(&content)
            .map_err(|e| ReadError::invalid_argument(format!("Invalid config JSON: {}", e)))?;

        if config.dataset.is_relative() {
            if let Some(dir) = path.parent() {
                config.dataset = dir.join(&config.dataset);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks everything that can be checked without the dataset
    pub fn validate(&self) -> ReadResult<()> {
        if self.num_partitions == 0 {
            return Err(ReadError::invalid_argument("numPartitions must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(ReadError::invalid_argument("batchSize must be > 0"));
        }
        if let Some(schema) = &self.schema {
            schema.validate()?;
        }

        let options = self.to_options()?;
        options.connection()?;
        options.read_source()?;
        Ok(())
    }

    /// The equivalent host option map
    pub fn to_options(&self) -> ReadResult<ReadOptions> {
        let mut options = ReadOptions::new()
            .with(CLIENT_URI, self.uri.as_str())
            .with(READ_NUM_PARTITIONS, self.num_partitions.to_string())
            .with(READ_BATCH_SIZE, self.batch_size.to_string());

        if let Some(plan) = &self.plan {
            let text = serde_json::to_string(plan)
                .map_err(|e| ReadError::invalid_argument(format!("Unable to encode plan: {}", e)))?;
            options.insert(READ_PLAN, text);
        }
        if let Some(invoke) = &self.invoke {
            options.insert(READ_INVOKE, invoke.as_str());
        }
        if let Some(script) = &self.script {
            options.insert(READ_SCRIPT, script.as_str());
        }
        for (name, value) in &self.vars {
            options.insert(format!("{}{}", READ_VARS_PREFIX, name), value.as_str());
        }
        if let Some(schema) = &self.schema {
            let text = serde_json::to_string(schema).map_err(|e| {
                ReadError::invalid_argument(format!("Unable to encode schema: {}", e))
            })?;
            options.insert(READ_SCHEMA, text);
        }

        Ok(options)
    }
}
