//! Logical plan structures
//!
//! A plan is a source view followed by an ordered list of stages. Plans are
//! plain serde values so the same structure is what the user supplies, what
//! the analyzer rewrites, and what is shipped to the remote side.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter operation types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "lowercase")]
pub enum FilterOp {
    /// Equality: field = value
    Eq(Value),
    /// Greater than or equal: field >= value
    Gte(Value),
    /// Greater than: field > value
    Gt(Value),
    /// Less than or equal: field <= value
    Lte(Value),
    /// Less than: field < value
    Lt(Value),
}

impl FilterOp {
    /// Returns the operation name for explain output
    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "eq",
            FilterOp::Gte(_) => "gte",
            FilterOp::Gt(_) => "gt",
            FilterOp::Lte(_) => "lte",
            FilterOp::Lt(_) => "lt",
        }
    }

    /// Returns the operand
    pub fn operand(&self) -> &Value {
        match self {
            FilterOp::Eq(v)
            | FilterOp::Gte(v)
            | FilterOp::Gt(v)
            | FilterOp::Lte(v)
            | FilterOp::Lt(v) => v,
        }
    }
}

/// A single predicate (field + operation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Field name
    pub field: String,
    /// Filter operation
    #[serde(flatten)]
    pub op: FilterOp,
}

impl Predicate {
    /// Create an equality predicate
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq(value),
        }
    }

    /// Create a range predicate (gte)
    pub fn gte(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Gte(value),
        }
    }

    /// Create a range predicate (lte)
    pub fn lte(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Lte(value),
        }
    }

    /// Create a range predicate (gt)
    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Gt(value),
        }
    }

    /// Create a range predicate (lt)
    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Lt(value),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort key and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A named bind parameter, resolved per execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindParam {
    #[serde(rename = "param")]
    pub name: String,
}

impl BindParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Source view of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Schema the view belongs to
    pub schema: String,
    /// View name
    pub view: String,
}

/// One stage of a plan, applied in order after the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// Keep rows matching all predicates (AND)
    Where { predicates: Vec<Predicate> },
    /// Keep only the listed columns
    Select { columns: Vec<String> },
    /// Order rows by a single field
    OrderBy { sort: SortSpec },
    /// Keep rows whose internal row id lies in `[lower, upper]`
    RowIdRange { lower: BindParam, upper: BindParam },
    /// Aggregate rows by key columns
    GroupBy { keys: Vec<String> },
    /// Keep at most `count` rows
    Limit { count: u64 },
    /// Skip the first `count` rows
    Offset { count: u64 },
}

impl Stage {
    /// Returns the stage name used in explain output and errors
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Where { .. } => "where",
            Stage::Select { .. } => "select",
            Stage::OrderBy { .. } => "order_by",
            Stage::RowIdRange { .. } => "row_id_range",
            Stage::GroupBy { .. } => "group_by",
            Stage::Limit { .. } => "limit",
            Stage::Offset { .. } => "offset",
        }
    }
}

/// A user-supplied logical plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalPlan {
    /// Source view (required for execution)
    #[serde(default)]
    pub source: Option<Source>,
    /// Stages applied in order
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl LogicalPlan {
    /// Creates a plan reading every row of a view
    pub fn from_view(schema: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            source: Some(Source {
                schema: schema.into(),
                view: view.into(),
            }),
            stages: Vec::new(),
        }
    }

    /// Parses a plan from its JSON form
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Appends a stage
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends a where stage with a single predicate
    pub fn filter(self, predicate: Predicate) -> Self {
        self.with_stage(Stage::Where {
            predicates: vec![predicate],
        })
    }

    /// Appends a select stage
    pub fn select(self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.with_stage(Stage::Select {
            columns: columns.into_iter().map(Into::into).collect(),
        })
    }

    /// Appends an order-by stage
    pub fn order_by(self, sort: SortSpec) -> Self {
        self.with_stage(Stage::OrderBy { sort })
    }
}
