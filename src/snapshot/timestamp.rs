//! SnapshotTimestamp - opaque point-in-time marker
//!
//! Issued by the server on the first sub-query of a read and bound verbatim
//! on every later sub-query. The value is never interpreted client-side.
//!
//! This is a PURE TYPE with NO behavior beyond construction and access.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A server-issued, opaque point-in-time value.
///
/// - Created once per read operation
/// - Shared read-only afterward
/// - Never persisted
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotTimestamp(String);

impl SnapshotTimestamp {
    /// Wraps a server-issued value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the value exactly as the server issued it.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
