//! Plan analyzer module
//!
//! Metric extraction, critical path search and CTE cross-referencing over
//! the enriched tree.

pub mod critical_path;
pub mod cte_analyzer;
pub mod metrics;
pub mod path_analyzer;

pub use critical_path::{calculate_critical_path, calculate_critical_path_by_name};
pub use cte_analyzer::{CteAnalyzer, analyze_ctes};
pub use metrics::{MetricExtractor, MetricKind, execution_time, total_cost};
pub use path_analyzer::{CriticalPath, DescentPolicy, analyze_cost, analyze_execution_time};
