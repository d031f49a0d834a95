//! Row versions and visibility
//!
//! - Every committed version carries a totally ordered [`CommitId`]
//! - A [`ReadView`] is a single upper bound on commit ids
//! - The visible version of a row is the one with the largest commit id at
//!   or below that bound; a visible tombstone hides the row
//!
//! These are pure types. The database owns all mutation.

use serde_json::Value;

/// A totally ordered commit identity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CommitId(u64);

impl CommitId {
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A stable snapshot boundary.
///
/// All versions with commit id above the bound are invisible.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ReadView {
    read_upper_bound: CommitId,
}

impl ReadView {
    #[inline]
    pub fn new(upper_bound: CommitId) -> Self {
        Self {
            read_upper_bound: upper_bound,
        }
    }

    #[inline]
    pub fn upper_bound(&self) -> CommitId {
        self.read_upper_bound
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VersionPayload {
    Document(Value),
    Tombstone,
}

/// One immutable version of a row.
#[derive(Clone, Debug, PartialEq)]
pub struct Version {
    payload: VersionPayload,
    commit_id: CommitId,
}

impl Version {
    pub fn document(body: Value, commit_id: CommitId) -> Self {
        Self {
            payload: VersionPayload::Document(body),
            commit_id,
        }
    }

    pub fn tombstone(commit_id: CommitId) -> Self {
        Self {
            payload: VersionPayload::Tombstone,
            commit_id,
        }
    }

    #[inline]
    pub fn payload(&self) -> &VersionPayload {
        &self.payload
    }

    #[inline]
    pub fn commit_id(&self) -> CommitId {
        self.commit_id
    }

    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self.payload, VersionPayload::Tombstone)
    }
}

/// All versions of one row, appended in commit order.
#[derive(Clone, Debug, Default)]
pub struct VersionChain {
    versions: Vec<Version>,
}

impl VersionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn push(&mut self, version: Version) {
        self.versions.push(version);
    }

    /// Returns the visible document body under `view`, if any.
    ///
    /// 1. Consider only versions with commit id <= the view's bound
    /// 2. Select the one with the largest commit id
    /// 3. A tombstone there means the row is invisible
    pub fn visible_document(&self, view: ReadView) -> Option<&Value> {
        let upper_bound = view.upper_bound();

        let visible = self
            .versions
            .iter()
            .filter(|v| v.commit_id() <= upper_bound)
            .max_by_key(|v| v.commit_id())?;

        match visible.payload() {
            VersionPayload::Document(body) => Some(body),
            VersionPayload::Tombstone => None,
        }
    }
}
