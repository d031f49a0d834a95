//! Read options as handed over by a host engine
//!
//! Keys:
//! - `aeroscan.client.uri`: connection descriptor
//! - `aeroscan.read.plan`: JSON logical plan
//! - `aeroscan.read.numPartitions`: partition count (default 1)
//! - `aeroscan.read.batchSize`: buckets per partition (default 1)
//! - `aeroscan.read.invoke`: server-side module path
//! - `aeroscan.read.script`: inline server-side source
//! - `aeroscan.read.vars.<name>`: variables for server-side code
//! - `aeroscan.read.schema`: JSON output schema
//!
//! Blank values count as absent.

use std::collections::BTreeMap;

use crate::emitter::OutputSchema;
use crate::executor::{CodeCall, ReadError, ReadResult};
use crate::planner::LogicalPlan;

use super::connection::ConnectionDescriptor;

pub const CLIENT_URI: &str = "aeroscan.client.uri";
pub const READ_PLAN: &str = "aeroscan.read.plan";
pub const READ_NUM_PARTITIONS: &str = "aeroscan.read.numPartitions";
pub const READ_BATCH_SIZE: &str = "aeroscan.read.batchSize";
pub const READ_INVOKE: &str = "aeroscan.read.invoke";
pub const READ_SCRIPT: &str = "aeroscan.read.script";
pub const READ_VARS_PREFIX: &str = "aeroscan.read.vars.";
pub const READ_SCHEMA: &str = "aeroscan.read.schema";

pub const DEFAULT_NUM_PARTITIONS: usize = 1;
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Where the rows of a read come from
#[derive(Debug, Clone, PartialEq)]
pub enum ReadSource {
    /// Partitioned plan execution
    Plan(LogicalPlan),
    /// Single-partition server-side code
    Code(CodeCall),
}

/// String option map with typed accessors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    options: BTreeMap<String, String>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    /// Trimmed value, `None` when absent or blank
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// True if any of the keys has a non-blank value
    pub fn has_option(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.get(key).is_some())
    }

    /// Parsed connection descriptor; required
    pub fn connection(&self) -> ReadResult<ConnectionDescriptor> {
        let uri = self.get(CLIENT_URI).ok_or_else(|| {
            ReadError::invalid_argument(format!("Option {} is required", CLIENT_URI))
        })?;
        ConnectionDescriptor::parse(uri)
    }

    pub fn partition_count(&self) -> ReadResult<usize> {
        self.positive(READ_NUM_PARTITIONS, DEFAULT_NUM_PARTITIONS)
    }

    pub fn batch_size(&self) -> ReadResult<usize> {
        self.positive(READ_BATCH_SIZE, DEFAULT_BATCH_SIZE)
    }

    fn positive(&self, key: &str, default: usize) -> ReadResult<usize> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(n),
                _ => Err(ReadError::invalid_argument(format!(
                    "Value of '{}' option must be numeric and greater than zero; was {}",
                    key, value
                ))),
            },
        }
    }

    /// Declared output schema, validated
    pub fn output_schema(&self) -> ReadResult<Option<OutputSchema>> {
        let text = match self.get(READ_SCHEMA) {
            None => return Ok(None),
            Some(text) => text,
        };
        let schema: OutputSchema = serde_json::from_str(text).map_err(|e| {
            ReadError::invalid_argument(format!("Unable to parse {}: {}", READ_SCHEMA, e))
        })?;
        schema.validate()?;
        Ok(Some(schema))
    }

    /// Variables for server-side code, with the prefix stripped
    pub fn vars(&self) -> BTreeMap<String, String> {
        self.options
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(READ_VARS_PREFIX)
                    .filter(|name| !name.is_empty())
                    .map(|name| (name.to_string(), value.clone()))
            })
            .collect()
    }

    /// Decides between plan and server-side code.
    ///
    /// Exactly one of plan, invoke and script must be set.
    pub fn read_source(&self) -> ReadResult<ReadSource> {
        let set: Vec<&str> = [READ_PLAN, READ_INVOKE, READ_SCRIPT]
            .into_iter()
            .filter(|key| self.has_option(&[*key]))
            .collect();

        match set.as_slice() {
            [] => Err(ReadError::invalid_argument(format!(
                "No read source; set one of {}, {}, {}",
                READ_PLAN, READ_INVOKE, READ_SCRIPT
            ))),
            [key] if *key == READ_PLAN => {
                let text = self.get(READ_PLAN).unwrap_or_default();
                let plan = LogicalPlan::from_json(text).map_err(|e| {
                    ReadError::invalid_argument(format!("Unable to parse {}: {}", READ_PLAN, e))
                })?;
                Ok(ReadSource::Plan(plan))
            }
            [key] => {
                let value = self.get(key).unwrap_or_default();
                let mut call = if *key == READ_INVOKE {
                    CodeCall::invoke(value)
                } else {
                    CodeCall::script(value)
                };
                call.vars = self.vars();
                Ok(ReadSource::Code(call))
            }
            many => Err(ReadError::invalid_argument(format!(
                "Only one read source may be set; found {}",
                many.join(", ")
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReadOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            options: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CodeSource;

    #[test]
    fn test_blank_counts_as_absent() {
        let options = ReadOptions::new().with(READ_PLAN, "   ").with(READ_INVOKE, "/a.js");
        assert!(!options.has_option(&[READ_PLAN]));
        assert!(options.has_option(&[READ_PLAN, READ_INVOKE]));
        assert_eq!(options.get(READ_PLAN), None);
    }

    #[test]
    fn test_counts_default_to_one() {
        let options = ReadOptions::new();
        assert_eq!(options.partition_count().unwrap(), 1);
        assert_eq!(options.batch_size().unwrap(), 1);
    }

    #[test]
    fn test_counts_must_be_positive() {
        let options = ReadOptions::new()
            .with(READ_NUM_PARTITIONS, "0")
            .with(READ_BATCH_SIZE, "abc");
        assert_eq!(
            options.partition_count().unwrap_err().code(),
            "AERO_READ_INVALID_ARGUMENT"
        );
        assert!(options.batch_size().is_err());
    }

    #[test]
    fn test_plan_source() {
        let options = ReadOptions::new().with(
            READ_PLAN,
            r#"{"source": {"schema": "Medical", "view": "Authors"}}"#,
        );
        match options.read_source().unwrap() {
            ReadSource::Plan(plan) => assert_eq!(plan.source.unwrap().view, "Authors"),
            ReadSource::Code(_) => panic!("expected plan"),
        }
    }

    #[test]
    fn test_code_source_with_vars() {
        let options: ReadOptions = [
            (READ_INVOKE, "/read/authors.js"),
            ("aeroscan.read.vars.country", "NZ"),
            ("aeroscan.read.vars.", "ignored"),
        ]
        .into_iter()
        .collect();

        match options.read_source().unwrap() {
            ReadSource::Code(call) => {
                assert_eq!(call.source, CodeSource::Invoke("/read/authors.js".into()));
                assert_eq!(call.vars.len(), 1);
                assert_eq!(call.vars.get("country").map(String::as_str), Some("NZ"));
            }
            ReadSource::Plan(_) => panic!("expected code"),
        }
    }

    #[test]
    fn test_source_required_and_exclusive() {
        assert!(ReadOptions::new().read_source().is_err());

        let both = ReadOptions::new()
            .with(READ_PLAN, "{}")
            .with(READ_SCRIPT, "1");
        assert!(both.read_source().is_err());
    }

    #[test]
    fn test_malformed_plan_rejected() {
        let options = ReadOptions::new().with(READ_PLAN, "{not json");
        assert_eq!(
            options.read_source().unwrap_err().code(),
            "AERO_READ_INVALID_ARGUMENT"
        );
    }

    #[test]
    fn test_output_schema() {
        let options = ReadOptions::new().with(READ_SCHEMA, r#"[{"name": "id", "type": "long"}]"#);
        assert_eq!(options.output_schema().unwrap().unwrap().len(), 1);
        assert!(ReadOptions::new().output_schema().unwrap().is_none());
    }

    #[test]
    fn test_missing_uri() {
        assert!(ReadOptions::new().connection().is_err());
    }
}
