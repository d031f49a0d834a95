//! Read planner
//!
//! Turns one logical plan into a partitioned, bound read.
//!
//! # Design Principles
//!
//! - Deterministic: same plan and counts produce the same analysis
//! - Total: buckets cover every unsigned 64-bit row id exactly once
//! - Early: every rejection happens before a remote call is issued
//!
//! # Layout
//!
//! `partition_count` partitions, each holding `batch_size` contiguous buckets,
//! concatenating to `[0, 2^64 - 1]`.

mod analyzer;
mod ast;
mod bucket;
mod divider;
mod errors;
mod explain;

pub use analyzer::{
    BindParams, BoundPlanTemplate, PlanAnalysis, PlanAnalyzer, LOWER_BOUND_PARAM,
    UPPER_BOUND_PARAM,
};
pub use ast::{BindParam, FilterOp, LogicalPlan, Predicate, SortDirection, SortSpec, Source, Stage};
pub use bucket::{Bucket, IdentifierDomain, Partition};
pub use divider::{BucketRangeDivider, MAX_BUCKETS};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult};
pub use explain::ExplainPlan;
