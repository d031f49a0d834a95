//! Predicate filtering and ordering of JSON rows
//!
//! No type coercion, no expressions, exact match only.

use std::cmp::Ordering;

use serde_json::Value;

use crate::planner::{FilterOp, Predicate, SortDirection, SortSpec};

/// Evaluates predicates against rows
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a row matches all predicates
    pub fn matches(row: &Value, predicates: &[Predicate]) -> bool {
        predicates
            .iter()
            .all(|pred| Self::matches_predicate(row, pred))
    }

    fn matches_predicate(row: &Value, predicate: &Predicate) -> bool {
        let field_value = match row.get(&predicate.field) {
            Some(v) => v,
            None => return false, // Missing field = no match
        };

        // Null values never match
        if field_value.is_null() {
            return false;
        }

        match &predicate.op {
            FilterOp::Eq(expected) => field_value == expected,
            FilterOp::Gte(bound) => Self::compare(field_value, bound).map_or(false, Ordering::is_ge),
            FilterOp::Gt(bound) => Self::compare(field_value, bound).map_or(false, Ordering::is_gt),
            FilterOp::Lte(bound) => Self::compare(field_value, bound).map_or(false, Ordering::is_le),
            FilterOp::Lt(bound) => Self::compare(field_value, bound).map_or(false, Ordering::is_lt),
        }
    }

    /// Numbers compare with numbers, strings with strings, nothing else
    fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
        match (actual, bound) {
            (Value::Number(a), Value::Number(b)) => {
                if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                    return Some(ai.cmp(&bi));
                }
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Sorts rows by one field
pub struct RowSorter;

impl RowSorter {
    /// Stable sort by `sort_spec`; rows missing the field sort first
    pub fn sort(rows: &mut [Value], sort_spec: &SortSpec) {
        rows.sort_by(|a, b| {
            let ordering = Self::compare_values(a.get(&sort_spec.field), b.get(&sort_spec.field));
            match sort_spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }

    /// null < bool < number < string < array < object
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let (a_val, b_val) = match (a, b) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => (a, b),
        };

        let type_order = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Array(_) => 4,
                Value::Object(_) => 5,
            }
        };

        let by_type = type_order(a_val).cmp(&type_order(b_val));
        if by_type != Ordering::Equal {
            return by_type;
        }

        match (a_val, b_val) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                let xf = x.as_f64().unwrap_or(0.0);
                let yf = y.as_f64().unwrap_or(0.0);
                xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => Ordering::Equal,
        }
    }
}
