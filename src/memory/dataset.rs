//! Dataset files for the in-memory database
//!
//! ```json
//! {
//!   "database": "Documents",
//!   "seed": 42,
//!   "views": [
//!     {"schema": "Medical", "view": "Authors", "rows": [{"name": "Jane"}]}
//!   ],
//!   "modules": {"/read/authors.js": ["{\"name\":\"Jane\"}"]}
//! }
//! ```
//!
//! Each view is loaded in one commit. A module returns its listed values
//! verbatim, ignoring variables.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::database::{MemoryDatabase, DEFAULT_DATABASE};

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

/// Rows of one view
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetView {
    pub schema: String,
    pub view: String,
    #[serde(default)]
    pub rows: Vec<Value>,
}

/// Contents of a dataset file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    #[serde(default = "default_database")]
    pub database: String,
    /// Seed for row id generation; random when absent
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub views: Vec<DatasetView>,
    #[serde(default)]
    pub modules: BTreeMap<String, Vec<Value>>,
}

impl Dataset {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Total rows across all views
    pub fn row_count(&self) -> usize {
        self.views.iter().map(|v| v.rows.len()).sum()
    }

    /// Builds a database holding this dataset
    pub fn into_database(self) -> MemoryDatabase {
        let db = match self.seed {
            Some(seed) => MemoryDatabase::with_seed(seed),
            None => MemoryDatabase::new(),
        }
        .named(self.database);

        for view in self.views {
            db.create_view(&view.schema, &view.view);
            if !view.rows.is_empty() {
                db.insert_many(&view.schema, &view.view, view.rows);
            }
        }

        for (path, values) in self.modules {
            let texts: Vec<String> = values
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            db.register_module(path, move |_vars| texts.clone());
        }

        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CodeCall, CodeService};
    use crate::planner::{BindParams, LogicalPlan};

    #[test]
    fn test_load_dataset() {
        let dataset = Dataset::from_json(
            r#"{
                "seed": 3,
                "views": [
                    {"schema": "Medical", "view": "Authors", "rows": [{"a": 1}, {"a": 2}]},
                    {"schema": "Medical", "view": "Empty"}
                ],
                "modules": {"/one.js": ["x", {"b": 1}]}
            }"#,
        )
        .unwrap();
        assert_eq!(dataset.row_count(), 2);

        let db = dataset.into_database();
        assert_eq!(db.name(), "Documents");

        let rows = db
            .query(
                &LogicalPlan::from_view("Medical", "Authors"),
                &BindParams::default(),
                db.current_snapshot(),
            )
            .unwrap();
        assert_eq!(rows.len(), 2);

        let empty = db
            .query(
                &LogicalPlan::from_view("Medical", "Empty"),
                &BindParams::default(),
                db.current_snapshot(),
            )
            .unwrap();
        assert!(empty.is_empty());

        let out = db.invoke(&CodeCall::invoke("/one.js")).unwrap();
        assert_eq!(out, vec!["x".to_string(), r#"{"b":1}"#.to_string()]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Dataset::from_json(r#"{"tables": []}"#).is_err());
    }
}
