//! Metric extractors
//!
//! Pure functions mapping a node to the scalar a path analyzer maximizes.

use crate::services::plan_analyzer::models::EnrichedNode;
use crate::utils::error::PlanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-node metric used by the path analyzers
pub type MetricExtractor = dyn Fn(&EnrichedNode) -> f64;

/// `Actual Total Time` in ms (0 without ANALYZE)
pub fn execution_time(node: &EnrichedNode) -> f64 {
    node.raw_f64("Actual Total Time").unwrap_or(0.0)
}

/// Planner's `Total Cost` (0 when absent)
pub fn total_cost(node: &EnrichedNode) -> f64 {
    node.raw_f64("Total Cost").unwrap_or(0.0)
}

/// Metric selector accepted by the critical path facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Time,
    Cost,
    /// Caller-supplied extractor, analyzed like `Time`
    Custom,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Time => "time",
            MetricKind::Cost => "cost",
            MetricKind::Custom => "custom",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(MetricKind::Time),
            "cost" => Ok(MetricKind::Cost),
            "custom" => Ok(MetricKind::Custom),
            other => Err(PlanError::unsupported_metric(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::plan_analyzer::parser::TreeTransformer;
    use serde_json::json;

    #[test]
    fn test_extractors_read_raw_values() {
        let raw = json!({"Node Type": "Seq Scan", "Total Cost": 431.5, "Actual Total Time": 2.75});
        let node = TreeTransformer::new().transform(raw.as_object().unwrap());

        assert_eq!(execution_time(&node), 2.75);
        assert_eq!(total_cost(&node), 431.5);
    }

    #[test]
    fn test_extractors_default_to_zero() {
        let raw = json!({"Node Type": "Result"});
        let node = TreeTransformer::new().transform(raw.as_object().unwrap());

        assert_eq!(execution_time(&node), 0.0);
        assert_eq!(total_cost(&node), 0.0);
    }

    #[test]
    fn test_metric_kind_parsing() {
        assert_eq!("time".parse::<MetricKind>().unwrap(), MetricKind::Time);
        assert_eq!("cost".parse::<MetricKind>().unwrap(), MetricKind::Cost);
        assert_eq!("custom".parse::<MetricKind>().unwrap(), MetricKind::Custom);
        assert!(matches!(
            "rows".parse::<MetricKind>(),
            Err(PlanError::UnsupportedMetric(m)) if m == "rows"
        ));
        assert_eq!(MetricKind::Cost.to_string(), "cost");
    }
}
