//! In-memory document database
//!
//! Rows live in views keyed by `(schema, view)`. Each row has a random
//! unsigned 64-bit row id and a version chain. Every write is one commit; the
//! decimal commit id is the snapshot timestamp handed back to readers.
//!
//! Reads never block writes for longer than it takes to copy the visible
//! rows of one view.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::executor::{
    BucketRequest, CodeCall, CodeService, CodeSource, RemoteError, RowBatch, RowService,
};
use crate::planner::{BindParams, LogicalPlan};
use crate::snapshot::SnapshotTimestamp;

use super::interpreter::PlanInterpreter;
use super::version::{CommitId, ReadView, Version, VersionChain};

/// Name used when none is given
pub const DEFAULT_DATABASE: &str = "Documents";

type ViewKey = (String, String);
type CodeModule = Arc<dyn Fn(&BTreeMap<String, String>) -> Vec<String> + Send + Sync>;

struct DatabaseState {
    highest_commit_id: u64,
    views: BTreeMap<ViewKey, BTreeMap<u64, VersionChain>>,
    rng: StdRng,
}

impl DatabaseState {
    fn next_commit_id(&mut self) -> CommitId {
        self.highest_commit_id += 1;
        CommitId::new(self.highest_commit_id)
    }

    fn current_snapshot(&self) -> ReadView {
        ReadView::new(CommitId::new(self.highest_commit_id))
    }
}

/// Process-local database implementing the remote execution interfaces.
pub struct MemoryDatabase {
    name: String,
    state: RwLock<DatabaseState>,
    modules: RwLock<BTreeMap<String, CodeModule>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Row ids are drawn from a seeded generator
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            name: DEFAULT_DATABASE.to_string(),
            state: RwLock::new(DatabaseState {
                highest_commit_id: 0,
                views: BTreeMap::new(),
                rng,
            }),
            modules: RwLock::new(BTreeMap::new()),
        }
    }

    /// Renames the database
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks a requested database name against this one
    pub fn select_database(&self, requested: Option<&str>) -> Result<(), RemoteError> {
        match requested {
            Some(name) if name != self.name => Err(RemoteError::no_such_database(name)),
            _ => Ok(()),
        }
    }

    /// Creates an empty view if it does not exist yet
    pub fn create_view(&self, schema: &str, view: &str) {
        self.write()
            .views
            .entry((schema.to_string(), view.to_string()))
            .or_default();
    }

    /// Inserts one row in its own commit, returning its row id
    pub fn insert(&self, schema: &str, view: &str, body: Value) -> u64 {
        self.insert_many(schema, view, vec![body])
            .pop()
            .unwrap_or_default()
    }

    /// Inserts rows in a single commit, returning their row ids in order
    pub fn insert_many(&self, schema: &str, view: &str, bodies: Vec<Value>) -> Vec<u64> {
        let mut state = self.write();
        let commit_id = state.next_commit_id();
        let DatabaseState { views, rng, .. } = &mut *state;
        let rows = views
            .entry((schema.to_string(), view.to_string()))
            .or_default();

        let mut ids = Vec::with_capacity(bodies.len());
        for body in bodies {
            let row_id = loop {
                let candidate: u64 = rng.gen();
                if !rows.contains_key(&candidate) {
                    break candidate;
                }
            };
            let mut chain = VersionChain::new();
            chain.push(Version::document(body, commit_id));
            rows.insert(row_id, chain);
            ids.push(row_id);
        }
        ids
    }

    /// Inserts a row under a caller-chosen row id
    pub fn insert_with_id(
        &self,
        schema: &str,
        view: &str,
        row_id: u64,
        body: Value,
    ) -> Result<CommitId, RemoteError> {
        let mut state = self.write();
        let key = (schema.to_string(), view.to_string());
        if state
            .views
            .get(&key)
            .map_or(false, |rows| rows.contains_key(&row_id))
        {
            return Err(RemoteError::rejected(format!("Row {} already exists", row_id)));
        }

        let commit_id = state.next_commit_id();
        let mut chain = VersionChain::new();
        chain.push(Version::document(body, commit_id));
        state.views.entry(key).or_default().insert(row_id, chain);
        Ok(commit_id)
    }

    /// Replaces the body of an existing row in a new commit
    pub fn update(
        &self,
        schema: &str,
        view: &str,
        row_id: u64,
        body: Value,
    ) -> Result<CommitId, RemoteError> {
        self.append_version(schema, view, row_id, Some(body))
    }

    /// Deletes a row in a new commit
    pub fn delete(&self, schema: &str, view: &str, row_id: u64) -> Result<CommitId, RemoteError> {
        self.append_version(schema, view, row_id, None)
    }

    fn append_version(
        &self,
        schema: &str,
        view: &str,
        row_id: u64,
        body: Option<Value>,
    ) -> Result<CommitId, RemoteError> {
        let mut state = self.write();
        let snapshot = state.current_snapshot();
        let key = (schema.to_string(), view.to_string());

        let live = state
            .views
            .get(&key)
            .and_then(|rows| rows.get(&row_id))
            .map_or(false, |chain| chain.visible_document(snapshot).is_some());
        if !live {
            return Err(RemoteError::rejected(format!(
                "Row {} does not exist in {}.{}",
                row_id, schema, view
            )));
        }

        let commit_id = state.next_commit_id();
        let version = match body {
            Some(body) => Version::document(body, commit_id),
            None => Version::tombstone(commit_id),
        };
        if let Some(chain) = state.views.get_mut(&key).and_then(|rows| rows.get_mut(&row_id)) {
            chain.push(version);
        }
        Ok(commit_id)
    }

    /// Read view at the latest commit
    pub fn current_snapshot(&self) -> ReadView {
        self.read().current_snapshot()
    }

    /// Runs a plan at a read view
    pub fn query(
        &self,
        plan: &LogicalPlan,
        params: &BindParams,
        view: ReadView,
    ) -> Result<Vec<Value>, RemoteError> {
        let source = plan
            .source
            .as_ref()
            .ok_or_else(|| RemoteError::rejected("Plan has no source view"))?;

        let rows: Vec<(u64, Value)> = {
            let state = self.read();
            let rows = state
                .views
                .get(&(source.schema.clone(), source.view.clone()))
                .ok_or_else(|| {
                    RemoteError::rejected(format!("Unknown view {}.{}", source.schema, source.view))
                })?;
            rows.iter()
                .filter_map(|(id, chain)| chain.visible_document(view).map(|body| (*id, body.clone())))
                .collect()
        };

        PlanInterpreter::execute(plan, params, rows)
    }

    /// Registers server-side code reachable by module path
    pub fn register_module<F>(&self, path: impl Into<String>, module: F)
    where
        F: Fn(&BTreeMap<String, String>) -> Vec<String> + Send + Sync + 'static,
    {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), Arc::new(module));
    }

    fn resolve_view(&self, point_in_time: Option<&SnapshotTimestamp>) -> Result<ReadView, RemoteError> {
        let current = self.current_snapshot();
        let timestamp = match point_in_time {
            None => return Ok(current),
            Some(ts) => ts,
        };

        let commit = timestamp.as_str().parse::<u64>().map_err(|_| {
            RemoteError::rejected(format!("Malformed point-in-time timestamp {}", timestamp))
        })?;
        if commit > current.upper_bound().value() {
            return Err(RemoteError::rejected(format!(
                "Point-in-time timestamp {} is in the future",
                timestamp
            )));
        }
        Ok(ReadView::new(CommitId::new(commit)))
    }

    fn read(&self) -> RwLockReadGuard<'_, DatabaseState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DatabaseState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl RowService for MemoryDatabase {
    fn execute_plan(&self, request: &BucketRequest<'_>) -> Result<RowBatch, RemoteError> {
        if request.cancel.is_cancelled() {
            return Err(RemoteError::Aborted);
        }
        self.select_database(request.database)?;

        let view = self.resolve_view(request.point_in_time)?;
        let rows = self.query(request.plan, request.params, view)?;

        if request.cancel.is_cancelled() {
            return Err(RemoteError::Aborted);
        }

        let timestamp = SnapshotTimestamp::new(view.upper_bound().value().to_string());
        Ok(RowBatch::new(rows, Some(timestamp)))
    }
}

impl CodeService for MemoryDatabase {
    /// Modules are looked up by path. An inline script is a JSON plan run at
    /// the latest commit, each row rendered as text.
    fn invoke(&self, call: &CodeCall) -> Result<Vec<String>, RemoteError> {
        self.select_database(call.database.as_deref())?;
        match &call.source {
            CodeSource::Invoke(path) => {
                let module = self
                    .modules
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(path)
                    .cloned()
                    .ok_or_else(|| RemoteError::rejected(format!("Module {} not found", path)))?;
                Ok(module(&call.vars))
            }
            CodeSource::Script(source) => {
                let plan = LogicalPlan::from_json(source)
                    .map_err(|e| RemoteError::rejected(format!("Unsupported script: {}", e)))?;
                let rows = self.query(&plan, &BindParams::default(), self.current_snapshot())?;
                Ok(rows.iter().map(Value::to_string).collect())
            }
        }
    }
}
