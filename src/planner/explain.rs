//! Explain output for plan analyses
//!
//! Produces deterministic, human-readable output of the partition layout.

use std::fmt;

use super::analyzer::PlanAnalysis;
use super::errors::PlannerError;

/// One partition line of explain output
#[derive(Debug, Clone)]
pub struct ExplainPartition {
    pub index: usize,
    /// `lower..=upper` per bucket, decimal
    pub buckets: Vec<String>,
}

/// Explain plan output
#[derive(Debug, Clone)]
pub struct ExplainPlan {
    /// Whether analysis succeeded
    pub accepted: bool,
    /// Stage names of the bound template, in order
    pub stages: Vec<String>,
    /// Partition layout (if accepted)
    pub partitions: Vec<ExplainPartition>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a successful analysis
    pub fn from_analysis(analysis: &PlanAnalysis) -> Self {
        let stages = analysis
            .template()
            .plan()
            .stages
            .iter()
            .map(|s| s.name().to_string())
            .collect();

        let partitions = analysis
            .partitions()
            .iter()
            .map(|p| ExplainPartition {
                index: p.index(),
                buckets: p
                    .buckets()
                    .iter()
                    .map(|b| format!("{}..={}", b.lower_bound(), b.upper_bound()))
                    .collect(),
            })
            .collect();

        Self {
            accepted: true,
            stages,
            partitions,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            stages: Vec::new(),
            partitions: Vec::new(),
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN READ ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            writeln!(f, "Stages: {}", self.stages.join(" -> "))?;
            writeln!(f, "Partitions: {}", self.partitions.len())?;
            for partition in &self.partitions {
                writeln!(f, "  [{}]", partition.index)?;
                for bucket in &partition.buckets {
                    writeln!(f, "    - {}", bucket)?;
                }
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
