//! Outbound interface to the remote database
//!
//! The remote side is reached through two blocking calls:
//! - [`RowService::execute_plan`]: run a bound plan template for one bucket
//! - [`CodeService::invoke`]: run server-side code and return its values
//!
//! Both are issued from within a partition's sequential task, one call in
//! flight per task.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::planner::{BindParams, LogicalPlan};
use crate::snapshot::{CancelToken, SnapshotTimestamp};

/// Errors reported by the remote side or the transport to it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("No such database {0}")]
    NoSuchDatabase(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Snapshot-establishing response carried no server timestamp")]
    MissingTimestamp,

    #[error("Request aborted")]
    Aborted,
}

impl RemoteError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        RemoteError::Unavailable(reason.into())
    }

    pub fn no_such_database(name: impl Into<String>) -> Self {
        RemoteError::NoSuchDatabase(name.into())
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        RemoteError::Rejected(reason.into())
    }
}

/// One bucket execution: the bound template plus its parameter values.
#[derive(Debug, Clone, Copy)]
pub struct BucketRequest<'a> {
    /// Bound plan template shared by every bucket
    pub plan: &'a LogicalPlan,
    /// Bucket bounds as unsigned decimal strings
    pub params: &'a BindParams,
    /// Point-in-time to read at; `None` only for the snapshot-establishing call
    pub point_in_time: Option<&'a SnapshotTimestamp>,
    /// Polled by long-running calls; a cancelled call should return `Aborted`
    pub cancel: &'a CancelToken,
    /// Database selected by the connection; `None` means the server default
    pub database: Option<&'a str>,
}

/// Rows returned for one bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    /// Result rows as JSON objects
    pub rows: Vec<Value>,
    /// Timestamp the server read at
    pub server_timestamp: Option<SnapshotTimestamp>,
}

impl RowBatch {
    pub fn new(rows: Vec<Value>, server_timestamp: Option<SnapshotTimestamp>) -> Self {
        Self {
            rows,
            server_timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Executes bound plans against the remote database.
pub trait RowService: Send + Sync {
    /// Executes the plan restricted to one bucket.
    ///
    /// Must be read-only and therefore idempotent for a fixed point in time.
    fn execute_plan(&self, request: &BucketRequest<'_>) -> Result<RowBatch, RemoteError>;
}

/// What server-side code to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSource {
    /// Path of a module installed on the server
    Invoke(String),
    /// Inline script source
    Script(String),
}

/// A server-side code call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCall {
    pub source: CodeSource,
    /// External variables passed to the code
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Database to run in; `None` means the server default
    #[serde(default)]
    pub database: Option<String>,
}

impl CodeCall {
    pub fn invoke(module: impl Into<String>) -> Self {
        Self {
            source: CodeSource::Invoke(module.into()),
            vars: BTreeMap::new(),
            database: None,
        }
    }

    pub fn script(code: impl Into<String>) -> Self {
        Self {
            source: CodeSource::Script(code.into()),
            vars: BTreeMap::new(),
            database: None,
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn in_database(mut self, database: Option<&str>) -> Self {
        self.database = database.map(str::to_string);
        self
    }
}

/// Runs server-side code, returning each produced value as text.
pub trait CodeService: Send + Sync {
    fn invoke(&self, call: &CodeCall) -> Result<Vec<String>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_such_database_message() {
        let err = RemoteError::no_such_database("database-doesnt-exist");
        assert_eq!(err.to_string(), "No such database database-doesnt-exist");
    }

    #[test]
    fn test_code_call_builder() {
        let call = CodeCall::invoke("/read/authors.js").with_var("country", "NZ");
        assert_eq!(call.source, CodeSource::Invoke("/read/authors.js".into()));
        assert_eq!(call.vars.get("country").map(String::as_str), Some("NZ"));
        assert_eq!(call.database, None);

        let call = call.in_database(Some("Documents"));
        assert_eq!(call.database.as_deref(), Some("Documents"));
    }

    #[test]
    fn test_row_batch_empty() {
        assert!(RowBatch::default().is_empty());
    }
}
