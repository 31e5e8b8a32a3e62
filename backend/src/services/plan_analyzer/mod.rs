//! PostgreSQL Plan Analyzer
//!
//! Turns `EXPLAIN (FORMAT JSON)` output into an enriched, id-addressed tree
//! with its critical path marked, ready for graph and grid rendering.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       analyze_plan()                        │
//! │                             │                               │
//! │           ┌─────────────────┼─────────────────┐             │
//! │           ▼                 ▼                 ▼             │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐     │
//! │  │    Parser    │   │   Analyzer   │   │  tree_utils  │     │
//! │  │  Document    │   │  Metrics     │   │  ids, walk,  │     │
//! │  │  Enricher    │   │  PathAnalyzer│   │  find, path  │     │
//! │  │  EdgeLabeler │   │  CriticalPath│   │              │     │
//! │  │  Transformer │   │  CteAnalyzer │   │              │     │
//! │  └──────────────┘   └──────────────┘   └──────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pg_plan_viz::services::plan_analyzer::{AnalysisOptions, analyze_plan_text};
//!
//! let result = analyze_plan_text(explain_output, &AnalysisOptions::default())?;
//! println!("critical path: {:?}", result.critical_path.node_ids);
//!
//! for reference in &result.cte_metadata().cte_references {
//!     println!("{} reads {}", reference.node_id, reference.cte_name);
//! }
//! ```

pub mod analyzer;
pub mod models;
pub mod parser;
pub mod tree_utils;


pub use analyzer::{CriticalPath, MetricKind, analyze_ctes, calculate_critical_path};
pub use models::*;
pub use parser::{EnrichOptions, TreeTransformer};

use crate::config::AnalysisConfig;
use crate::utils::error::{PlanError, PlanResult};
use analyzer::MetricExtractor;
use parser::core::DocumentParser;
use serde_json::Value;

/// Options for a full analysis run
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub metric: MetricKind,
    pub enrich: EnrichOptions,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self { metric: MetricKind::Time, enrich: EnrichOptions::default() }
    }
}

impl AnalysisOptions {
    /// Options from the `[analysis]` config section
    ///
    /// A config cannot name a custom metric, and the threshold must be a
    /// finite factor of at least 1.
    pub fn from_config(config: &AnalysisConfig) -> PlanResult<Self> {
        let metric: MetricKind = config.default_metric.parse()?;
        if metric == MetricKind::Custom {
            return Err(PlanError::invalid_config(
                "analysis.default_metric cannot be \"custom\"",
            ));
        }

        let threshold = config.estimation_threshold;
        if !threshold.is_finite() || threshold < 1.0 {
            return Err(PlanError::invalid_config(format!(
                "analysis.estimation_threshold must be a finite number >= 1.0, got {}",
                threshold
            )));
        }

        Ok(Self { metric, enrich: EnrichOptions { estimation_threshold: threshold } })
    }

    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric;
        self
    }
}

/// Parse EXPLAIN output text into a JSON document
pub fn parse_plan_document(text: &str) -> PlanResult<Value> {
    Ok(DocumentParser::parse_str(text)?)
}

/// Analyze EXPLAIN output given as text
pub fn analyze_plan_text(
    text: &str,
    options: &AnalysisOptions,
) -> PlanResult<PlanAnalysisResponse> {
    let document = parse_plan_document(text)?;
    analyze_plan(&document, options)
}

/// Analyze a parsed EXPLAIN document
///
/// Runs transform, id assignment and critical path search, then summarizes
/// the document. `MetricKind::Custom` needs [`analyze_plan_with`].
pub fn analyze_plan(
    document: &Value,
    options: &AnalysisOptions,
) -> PlanResult<PlanAnalysisResponse> {
    analyze_plan_with(document, options, None)
}

/// Same as [`analyze_plan`] with an optional custom metric extractor
pub fn analyze_plan_with(
    document: &Value,
    options: &AnalysisOptions,
    custom: Option<&MetricExtractor>,
) -> PlanResult<PlanAnalysisResponse> {
    let mut tree = TreeTransformer::with_options(options.enrich).transform_document(document)?;
    let path = calculate_critical_path(&mut tree, options.metric, custom)?;

    let summary = summarize(document, &tree);
    tracing::info!(
        "Analyzed plan: {} nodes, depth {}, critical path of {} nodes by {}",
        summary.total_nodes,
        summary.max_depth,
        path.node_count(),
        options.metric
    );

    Ok(PlanAnalysisResponse {
        summary,
        metric: options.metric.to_string(),
        critical_path: CriticalPathSummary { node_ids: path.node_ids(&tree), total: path.total },
        tree,
    })
}

impl PlanAnalysisResponse {
    /// CTE cross-references of the analyzed tree
    pub fn cte_metadata(&self) -> CteMetadata<'_> {
        analyze_ctes(&self.tree)
    }
}

fn summarize(document: &Value, tree: &EnrichedNode) -> PlanSummary {
    let (planning_time_ms, execution_time_ms) = DocumentParser::timings(document);

    let mut has_actual_timing = false;
    tree_utils::walk_tree(tree, &mut |node, _, _| {
        has_actual_timing |= node.raw_node.contains_key("Actual Total Time");
    });

    PlanSummary {
        planning_time_ms,
        execution_time_ms,
        total_nodes: tree_utils::count_nodes(tree),
        max_depth: tree_utils::max_depth(tree),
        total_cost: tree.raw_f64("Total Cost").unwrap_or(0.0),
        has_actual_timing,
    }
}
