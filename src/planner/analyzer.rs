//! Plan analysis
//!
//! Turns a user plan plus `(partition_count, batch_size)` into a
//! [`PlanAnalysis`]: one bound plan template and the partition/bucket layout.
//!
//! Analysis order:
//! 1. Divide the identifier domain (rejects bad counts before anything else)
//! 2. Rewrite the plan with a row-id range stage ahead of every other stage
//! 3. Group the flat bucket list into partitions of `batch_size` buckets
//!
//! Every analysis upholds:
//! - `partitions.len() == partition_count`, each with `batch_size` buckets
//! - concatenated buckets cover the domain with no gaps and no overlaps

use std::collections::BTreeMap;

use serde::Serialize;

use super::ast::{BindParam, LogicalPlan, Stage};
use super::bucket::{Bucket, IdentifierDomain, Partition};
use super::divider::BucketRangeDivider;
use super::errors::{PlannerError, PlannerResult};

/// Bind parameter carrying a bucket's lower bound
pub const LOWER_BOUND_PARAM: &str = "AERO_LOWER_BOUND";
/// Bind parameter carrying a bucket's upper bound
pub const UPPER_BOUND_PARAM: &str = "AERO_UPPER_BOUND";

/// Parameter values for one execution of a bound plan template.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BindParams(BTreeMap<String, String>);

impl BindParams {
    /// Returns the bound value of a parameter
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Resolves a row-id bound parameter to its unsigned value
    pub fn resolve_row_id(&self, param: &BindParam) -> Option<u64> {
        self.get(&param.name).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A plan with exactly two free parameters: the bucket bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundPlanTemplate {
    plan: LogicalPlan,
}

impl BoundPlanTemplate {
    /// Returns the rewritten plan
    pub fn plan(&self) -> &LogicalPlan {
        &self.plan
    }

    /// Binds the template to a bucket's bounds
    pub fn bind(&self, bucket: &Bucket) -> BindParams {
        let mut params = BTreeMap::new();
        params.insert(LOWER_BOUND_PARAM.to_string(), bucket.lower_bound_param());
        params.insert(UPPER_BOUND_PARAM.to_string(), bucket.upper_bound_param());
        BindParams(params)
    }
}

/// Result of analyzing a plan: the template plus the partition layout.
///
/// Immutable once built; shared read-only by every partition task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanAnalysis {
    template: BoundPlanTemplate,
    partitions: Vec<Partition>,
}

impl PlanAnalysis {
    /// Returns the bound plan template
    pub fn template(&self) -> &BoundPlanTemplate {
        &self.template
    }

    /// Returns the partitions in order
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Returns a single partition
    pub fn partition(&self, index: usize) -> Option<&Partition> {
        self.partitions.get(index)
    }

    /// Returns every bucket across all partitions, in order
    pub fn all_buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.partitions.iter().flat_map(|p| p.buckets().iter())
    }

    /// Returns the total number of buckets
    pub fn bucket_count(&self) -> usize {
        self.partitions.iter().map(Partition::len).sum()
    }
}

/// Produces plan analyses over an identifier domain.
#[derive(Debug, Clone, Default)]
pub struct PlanAnalyzer {
    domain: IdentifierDomain,
}

impl PlanAnalyzer {
    /// Creates an analyzer over the full unsigned 64-bit domain
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an analyzer over a narrower domain
    pub fn with_domain(domain: IdentifierDomain) -> Self {
        Self { domain }
    }

    /// Analyzes a plan, returning the template and partition layout.
    ///
    /// Fails before any execution if the counts are invalid or the plan
    /// cannot take a row-id range filter.
    pub fn analyze_plan(
        &self,
        plan: &LogicalPlan,
        partition_count: usize,
        batch_size: usize,
    ) -> PlannerResult<PlanAnalysis> {
        // 1. Divide the domain
        let buckets = BucketRangeDivider::divide(self.domain, partition_count, batch_size)?;

        // 2. Rewrite the plan into a bound template
        let template = Self::bind_template(plan)?;

        // 3. Group consecutive buckets into partitions
        let partitions = buckets
            .chunks(batch_size)
            .enumerate()
            .map(|(index, chunk)| {
                Partition::new(index, chunk.to_vec()).ok_or_else(|| {
                    PlannerError::planning(format!(
                        "partition {} is not a contiguous bucket run",
                        index
                    ))
                })
            })
            .collect::<PlannerResult<Vec<_>>>()?;

        Ok(PlanAnalysis {
            template,
            partitions,
        })
    }

    /// Inserts the row-id range stage ahead of every existing stage.
    ///
    /// Later stages then operate on the already-restricted rows, so each
    /// bucket's output is exactly the original output restricted to the bucket.
    fn bind_template(plan: &LogicalPlan) -> PlannerResult<BoundPlanTemplate> {
        if plan.source.is_none() {
            return Err(PlannerError::planning("plan has no source view"));
        }

        for stage in &plan.stages {
            match stage {
                Stage::GroupBy { .. } => {
                    return Err(PlannerError::unboundable_stage(
                        stage.name(),
                        "aggregates over a bucket do not combine into the aggregate over the whole result",
                    ));
                }
                Stage::Limit { .. } | Stage::Offset { .. } => {
                    return Err(PlannerError::unboundable_stage(
                        stage.name(),
                        "a per-bucket row window does not bound the whole result",
                    ));
                }
                Stage::RowIdRange { .. } => {
                    return Err(PlannerError::unboundable_stage(
                        stage.name(),
                        "plan is already bound to a row-id range",
                    ));
                }
                Stage::Where { .. } | Stage::Select { .. } | Stage::OrderBy { .. } => {}
            }
        }

        let mut bound = plan.clone();
        bound.stages.insert(
            0,
            Stage::RowIdRange {
                lower: BindParam::new(LOWER_BOUND_PARAM),
                upper: BindParam::new(UPPER_BOUND_PARAM),
            },
        );

        Ok(BoundPlanTemplate { plan: bound })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ast::{Predicate, SortSpec};
    use serde_json::json;

    fn authors() -> LogicalPlan {
        LogicalPlan::from_view("Medical", "Authors")
    }

    #[test]
    fn test_partition_and_bucket_counts() {
        let analyzer = PlanAnalyzer::new();
        for (p, b) in [(1, 1), (1, 2), (1, 16), (2, 1), (2, 2), (2, 16), (16, 1), (16, 2), (16, 16)] {
            let analysis = analyzer.analyze_plan(&authors(), p, b).unwrap();
            assert_eq!(analysis.partitions().len(), p);
            assert!(analysis.partitions().iter().all(|part| part.len() == b));
            assert_eq!(analysis.bucket_count(), p * b);
        }
    }

    #[test]
    fn test_buckets_cover_all_unsigned_longs() {
        let analysis = PlanAnalyzer::new().analyze_plan(&authors(), 4, 3).unwrap();
        let buckets: Vec<&Bucket> = analysis.all_buckets().collect();

        assert_eq!(buckets[0].lower_bound_param(), "0");
        assert_eq!(
            buckets[buckets.len() - 1].upper_bound_param(),
            "18446744073709551615"
        );
        for pair in buckets.windows(2) {
            assert_eq!(pair[1].lower_bound(), pair[0].upper_bound() + 1);
        }
    }

    #[test]
    fn test_partition_indexes_are_positional() {
        let analysis = PlanAnalyzer::new().analyze_plan(&authors(), 3, 2).unwrap();
        let indexes: Vec<usize> = analysis.partitions().iter().map(|p| p.index()).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_range_stage_inserted_first() {
        let plan = authors()
            .filter(Predicate::eq("country", json!("NZ")))
            .order_by(SortSpec::asc("name"));
        let analysis = PlanAnalyzer::new().analyze_plan(&plan, 1, 1).unwrap();
        let stages = &analysis.template().plan().stages;

        assert_eq!(stages.len(), 3);
        assert_eq!(
            stages[0],
            Stage::RowIdRange {
                lower: BindParam::new(LOWER_BOUND_PARAM),
                upper: BindParam::new(UPPER_BOUND_PARAM),
            }
        );
        assert_eq!(stages[1].name(), "where");
        assert_eq!(stages[2].name(), "order_by");
    }

    #[test]
    fn test_user_plan_left_untouched() {
        let plan = authors().select(["name"]);
        let _ = PlanAnalyzer::new().analyze_plan(&plan, 2, 2).unwrap();
        assert_eq!(plan.stages.len(), 1);
    }

    #[test]
    fn test_bind_uses_bucket_bounds() {
        let analysis = PlanAnalyzer::new().analyze_plan(&authors(), 2, 1).unwrap();
        let last = analysis.partitions()[1].buckets()[0];
        let params = analysis.template().bind(&last);

        assert_eq!(params.get(UPPER_BOUND_PARAM), Some("18446744073709551615"));
        assert_eq!(
            params.resolve_row_id(&BindParam::new(LOWER_BOUND_PARAM)),
            Some(last.lower_bound())
        );
    }

    #[test]
    fn test_aggregate_rejected() {
        let plan = authors().with_stage(Stage::GroupBy {
            keys: vec!["country".into()],
        });
        let err = PlanAnalyzer::new().analyze_plan(&plan, 2, 2).unwrap_err();
        assert_eq!(err.code().code(), "AERO_READ_PLANNING");
        assert_eq!(err.stage(), Some("group_by"));
    }

    #[test]
    fn test_limit_and_offset_rejected() {
        let limit = authors().with_stage(Stage::Limit { count: 10 });
        let offset = authors().with_stage(Stage::Offset { count: 10 });
        assert!(PlanAnalyzer::new().analyze_plan(&limit, 1, 1).is_err());
        assert!(PlanAnalyzer::new().analyze_plan(&offset, 1, 1).is_err());
    }

    #[test]
    fn test_already_bound_rejected() {
        let analysis = PlanAnalyzer::new().analyze_plan(&authors(), 1, 1).unwrap();
        let rebound = PlanAnalyzer::new().analyze_plan(analysis.template().plan(), 1, 1);
        assert_eq!(rebound.unwrap_err().stage(), Some("row_id_range"));
    }

    #[test]
    fn test_missing_source_rejected() {
        let plan = LogicalPlan {
            source: None,
            stages: Vec::new(),
        };
        let err = PlanAnalyzer::new().analyze_plan(&plan, 1, 1).unwrap_err();
        assert!(err.message().contains("source"));
    }

    #[test]
    fn test_invalid_counts_rejected_before_plan_checks() {
        let plan = authors().with_stage(Stage::Limit { count: 1 });
        let err = PlanAnalyzer::new().analyze_plan(&plan, 0, 1).unwrap_err();
        assert_eq!(err.code().code(), "AERO_READ_INVALID_ARGUMENT");
    }

    #[test]
    fn test_narrow_domain() {
        let domain = IdentifierDomain::new(0, 99).unwrap();
        let analysis = PlanAnalyzer::with_domain(domain)
            .analyze_plan(&authors(), 2, 5)
            .unwrap();
        assert_eq!(analysis.partitions()[1].upper_bound(), 99);
    }
}
