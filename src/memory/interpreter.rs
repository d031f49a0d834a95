//! Plan interpreter
//!
//! Applies a plan's stages, in order, to the rows of its source view as seen
//! through one read view. Row ids travel with the rows until an aggregation
//! drops them.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::executor::RemoteError;
use crate::planner::{BindParam, BindParams, LogicalPlan, Stage};

use super::filters::{PredicateFilter, RowSorter};

type IdRow = (Option<u64>, Value);

/// Stateless plan evaluation
pub struct PlanInterpreter;

impl PlanInterpreter {
    /// Runs every stage of `plan` over `rows`, which must be in row id order.
    pub fn execute(
        plan: &LogicalPlan,
        params: &BindParams,
        rows: Vec<(u64, Value)>,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut current: Vec<IdRow> = rows.into_iter().map(|(id, body)| (Some(id), body)).collect();

        for stage in &plan.stages {
            current = Self::apply(stage, params, current)?;
        }

        Ok(current.into_iter().map(|(_, body)| body).collect())
    }

    fn apply(stage: &Stage, params: &BindParams, rows: Vec<IdRow>) -> Result<Vec<IdRow>, RemoteError> {
        let out = match stage {
            Stage::RowIdRange { lower, upper } => {
                let lower = Self::resolve(params, lower)?;
                let upper = Self::resolve(params, upper)?;
                rows.into_iter()
                    .filter(|(id, _)| id.map_or(false, |id| lower <= id && id <= upper))
                    .collect()
            }
            Stage::Where { predicates } => rows
                .into_iter()
                .filter(|(_, body)| PredicateFilter::matches(body, predicates))
                .collect(),
            Stage::Select { columns } => rows
                .into_iter()
                .map(|(id, body)| (id, Self::project(&body, columns)))
                .collect(),
            Stage::OrderBy { sort } => {
                // Row ids are dropped once rows are reordered
                let mut bodies: Vec<Value> = rows.into_iter().map(|(_, body)| body).collect();
                RowSorter::sort(&mut bodies, sort);
                bodies.into_iter().map(|body| (None, body)).collect()
            }
            Stage::GroupBy { keys } => Self::group(rows, keys),
            Stage::Limit { count } => rows.into_iter().take(Self::count(*count)).collect(),
            Stage::Offset { count } => rows.into_iter().skip(Self::count(*count)).collect(),
        };
        Ok(out)
    }

    fn resolve(params: &BindParams, param: &BindParam) -> Result<u64, RemoteError> {
        params.resolve_row_id(param).ok_or_else(|| {
            RemoteError::rejected(format!(
                "Bind parameter {} is unbound or not an unsigned 64-bit integer",
                param.name
            ))
        })
    }

    fn count(count: u64) -> usize {
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    fn project(body: &Value, columns: &[String]) -> Value {
        let mut object = Map::new();
        for column in columns {
            if let Some(value) = body.get(column) {
                object.insert(column.clone(), value.clone());
            }
        }
        Value::Object(object)
    }

    /// One output row per distinct key tuple, carrying the keys and a count
    fn group(rows: Vec<IdRow>, keys: &[String]) -> Vec<IdRow> {
        let mut groups: BTreeMap<String, (Map<String, Value>, u64)> = BTreeMap::new();

        for (_, body) in rows {
            let key_values: Vec<Value> = keys
                .iter()
                .map(|k| body.get(k).cloned().unwrap_or(Value::Null))
                .collect();
            let group_key = Value::Array(key_values.clone()).to_string();

            let entry = groups.entry(group_key).or_insert_with(|| {
                let object = keys.iter().cloned().zip(key_values).collect();
                (object, 0)
            });
            entry.1 += 1;
        }

        groups
            .into_values()
            .map(|(mut object, count)| {
                object.insert("count".to_string(), Value::from(count));
                (None, Value::Object(object))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{Bucket, PlanAnalyzer, Predicate, SortSpec};
    use serde_json::json;

    fn rows() -> Vec<(u64, Value)> {
        vec![
            (10, json!({"name": "a", "age": 30, "city": "x"})),
            (20, json!({"name": "b", "age": 15, "city": "y"})),
            (30, json!({"name": "c", "age": 42, "city": "x"})),
        ]
    }

    #[test]
    fn test_where_select() {
        let plan = LogicalPlan::from_view("s", "v")
            .filter(Predicate::gte("age", json!(18)))
            .select(["name"]);
        let out = PlanInterpreter::execute(&plan, &BindParams::default(), rows()).unwrap();
        assert_eq!(out, vec![json!({"name": "a"}), json!({"name": "c"})]);
    }

    #[test]
    fn test_row_id_range_uses_bound_params() {
        let plan = LogicalPlan::from_view("s", "v");
        let analysis = PlanAnalyzer::new().analyze_plan(&plan, 1, 1).unwrap();
        let params = analysis.template().bind(&Bucket::new(15, 30).unwrap());

        let out = PlanInterpreter::execute(analysis.template().plan(), &params, rows()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["name"], "b");
    }

    #[test]
    fn test_unbound_range_rejected() {
        let plan = LogicalPlan::from_view("s", "v");
        let analysis = PlanAnalyzer::new().analyze_plan(&plan, 1, 1).unwrap();

        let err = PlanInterpreter::execute(analysis.template().plan(), &BindParams::default(), rows())
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
    }

    #[test]
    fn test_order_limit_offset() {
        let plan = LogicalPlan::from_view("s", "v")
            .order_by(SortSpec::desc("age"))
            .with_stage(Stage::Offset { count: 1 })
            .with_stage(Stage::Limit { count: 1 });
        let out = PlanInterpreter::execute(&plan, &BindParams::default(), rows()).unwrap();
        assert_eq!(out, vec![json!({"name": "a", "age": 30, "city": "x"})]);
    }

    #[test]
    fn test_group_by_counts() {
        let plan = LogicalPlan::from_view("s", "v").with_stage(Stage::GroupBy {
            keys: vec!["city".into()],
        });
        let out = PlanInterpreter::execute(&plan, &BindParams::default(), rows()).unwrap();
        assert_eq!(
            out,
            vec![json!({"city": "x", "count": 2}), json!({"city": "y", "count": 1})]
        );
    }
}
