//! Output schema declared by the host
//!
//! Supported column types:
//! - string: JSON string
//! - long: JSON integer that fits in i64
//! - double: any JSON number
//! - boolean: JSON bool
//! - json: any JSON value, kept as-is

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::executor::{ReadError, ReadResult};

/// Reserved column carrying the raw text of a value that did not fit the schema
pub const CORRUPT_RECORD_COLUMN: &str = "_corrupt_record";

/// Column name used when no schema is declared
pub const PASSTHROUGH_COLUMN: &str = "value";

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Long,
    Double,
    Boolean,
    Json,
}

/// One declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered column declarations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSchema {
    fields: Vec<FieldSpec>,
}

impl OutputSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Builder-style column append
    pub fn with_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(FieldSpec::new(name, data_type));
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Rejects empty schemas, duplicate names and the reserved column name.
    pub fn validate(&self) -> ReadResult<()> {
        if self.fields.is_empty() {
            return Err(ReadError::invalid_argument(
                "Output schema must declare at least one column",
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ReadError::invalid_argument(
                    "Output schema column names must not be blank",
                ));
            }
            if field.name == CORRUPT_RECORD_COLUMN {
                return Err(ReadError::invalid_argument(format!(
                    "Output schema must not declare reserved column {}",
                    CORRUPT_RECORD_COLUMN
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ReadError::invalid_argument(format!(
                    "Output schema declares column {} more than once",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_from_json() {
        let schema: OutputSchema = serde_json::from_value(json!([
            {"name": "id", "type": "long"},
            {"name": "name", "type": "string"}
        ]))
        .unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields()[0].data_type, DataType::Long);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_reserved_column_rejected() {
        let schema = OutputSchema::default().with_field(CORRUPT_RECORD_COLUMN, DataType::String);
        let err = schema.validate().unwrap_err();
        assert_eq!(err.code(), "AERO_READ_INVALID_ARGUMENT");
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let schema = OutputSchema::default()
            .with_field("a", DataType::Long)
            .with_field("a", DataType::String);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(OutputSchema::default().validate().is_err());
    }
}
