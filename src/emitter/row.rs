//! Engine rows

use serde_json::{Map, Value};

use super::schema::CORRUPT_RECORD_COLUMN;

/// One cell of an engine row
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Field absent from the source value
    Missing,
    /// Field present with an explicit null
    Null,
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Json(Value),
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// JSON rendering; `None` for missing cells
    pub fn to_json(&self) -> Option<Value> {
        match self {
            FieldValue::Missing => None,
            FieldValue::Null => Some(Value::Null),
            FieldValue::String(s) => Some(Value::String(s.clone())),
            FieldValue::Long(n) => Some(Value::from(*n)),
            FieldValue::Double(d) => Some(Value::from(*d)),
            FieldValue::Boolean(b) => Some(Value::Bool(*b)),
            FieldValue::Json(v) => Some(v.clone()),
        }
    }
}

/// A named, ordered row handed to the host
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, FieldValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, FieldValue)>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[(String, FieldValue)] {
        &self.columns
    }

    /// Looks up a cell by column name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// True if the raw value could not be projected into the schema
    pub fn is_corrupted(&self) -> bool {
        matches!(self.get(CORRUPT_RECORD_COLUMN), Some(FieldValue::String(_)))
    }

    /// Renders the row as a JSON object, omitting missing cells
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (name, value) in &self.columns {
            if let Some(json) = value.to_json() {
                object.insert(name.clone(), json);
            }
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_is_omitted_null_is_kept() {
        let row = Row::new(vec![
            ("a".into(), FieldValue::Missing),
            ("b".into(), FieldValue::Null),
            ("c".into(), FieldValue::Long(3)),
        ]);
        assert_eq!(row.to_json(), json!({"b": null, "c": 3}));
    }

    #[test]
    fn test_get_by_name() {
        let row = Row::new(vec![("name".into(), FieldValue::String("Jane".into()))]);
        assert_eq!(row.get("name"), Some(&FieldValue::String("Jane".into())));
        assert_eq!(row.get("other"), None);
        assert!(!row.is_corrupted());
    }
}
