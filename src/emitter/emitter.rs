//! ResultRowEmitter: raw result values to engine rows
//!
//! The mode is fixed when the emitter is built:
//! - passthrough: one `value` column holding the raw text
//! - structured: the raw text is parsed as a JSON object and projected into
//!   the declared columns
//!
//! Typing is strict. A value that is not a JSON object, or any field whose
//! type does not match its column, turns the whole record into a corrupted
//! row: every declared column `Missing` and `_corrupt_record` holding the raw
//! text. The read continues either way.

use serde_json::{Map, Value};

use super::row::{FieldValue, Row};
use super::schema::{DataType, OutputSchema, CORRUPT_RECORD_COLUMN, PASSTHROUGH_COLUMN};

/// How raw values become rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitMode {
    Passthrough,
    Structured(OutputSchema),
}

/// Converts raw result values into rows
#[derive(Debug, Clone)]
pub struct ResultRowEmitter {
    mode: EmitMode,
}

impl ResultRowEmitter {
    /// Structured when a schema is declared, passthrough otherwise
    pub fn new(schema: Option<OutputSchema>) -> Self {
        let mode = match schema {
            Some(schema) => EmitMode::Structured(schema),
            None => EmitMode::Passthrough,
        };
        Self { mode }
    }

    pub fn passthrough() -> Self {
        Self {
            mode: EmitMode::Passthrough,
        }
    }

    pub fn mode(&self) -> &EmitMode {
        &self.mode
    }

    /// Column names of every row this emitter produces
    pub fn column_names(&self) -> Vec<&str> {
        match &self.mode {
            EmitMode::Passthrough => vec![PASSTHROUGH_COLUMN],
            EmitMode::Structured(schema) => schema
                .fields()
                .iter()
                .map(|f| f.name.as_str())
                .chain(std::iter::once(CORRUPT_RECORD_COLUMN))
                .collect(),
        }
    }

    /// Converts one raw value
    pub fn emit(&self, raw: &str) -> Row {
        match &self.mode {
            EmitMode::Passthrough => Row::new(vec![(
                PASSTHROUGH_COLUMN.to_string(),
                FieldValue::String(raw.to_string()),
            )]),
            EmitMode::Structured(schema) => match Self::project(schema, raw) {
                Some(row) => row,
                None => Self::corrupted(schema, raw),
            },
        }
    }

    fn project(schema: &OutputSchema, raw: &str) -> Option<Row> {
        let parsed: Value = serde_json::from_str(raw).ok()?;
        let object = parsed.as_object()?;

        let mut columns = Vec::with_capacity(schema.len() + 1);
        for field in schema.fields() {
            let value = Self::convert(object, &field.name, field.data_type)?;
            columns.push((field.name.clone(), value));
        }
        columns.push((CORRUPT_RECORD_COLUMN.to_string(), FieldValue::Missing));

        Some(Row::new(columns))
    }

    /// `None` means a type mismatch
    fn convert(object: &Map<String, Value>, name: &str, data_type: DataType) -> Option<FieldValue> {
        let value = match object.get(name) {
            None => return Some(FieldValue::Missing),
            Some(Value::Null) => return Some(FieldValue::Null),
            Some(value) => value,
        };

        match (data_type, value) {
            (DataType::String, Value::String(s)) => Some(FieldValue::String(s.clone())),
            (DataType::Long, Value::Number(n)) => n.as_i64().map(FieldValue::Long),
            (DataType::Double, Value::Number(n)) => n.as_f64().map(FieldValue::Double),
            (DataType::Boolean, Value::Bool(b)) => Some(FieldValue::Boolean(*b)),
            (DataType::Json, v) => Some(FieldValue::Json(v.clone())),
            _ => None,
        }
    }

    fn corrupted(schema: &OutputSchema, raw: &str) -> Row {
        let mut columns: Vec<(String, FieldValue)> = schema
            .fields()
            .iter()
            .map(|f| (f.name.clone(), FieldValue::Missing))
            .collect();
        columns.push((
            CORRUPT_RECORD_COLUMN.to_string(),
            FieldValue::String(raw.to_string()),
        ));
        Row::new(columns)
    }
}
