//! Tree transformer for PostgreSQL plans
//!
//! Builds the enriched tree depth-first: enrich the node, label the edge
//! against the raw parent, then recurse into `Plans` in original order.

use crate::services::plan_analyzer::models::constants::PLANS_FIELD;
use crate::services::plan_analyzer::models::{EnrichedNode, RawPlanNode};
use crate::services::plan_analyzer::parser::core::{
    DocumentParser, EdgeLabeler, EnrichOptions, NodeEnricher,
};
use crate::services::plan_analyzer::parser::error::ParseResult;
use serde_json::Value;

/// Transformer from raw plan JSON to the enriched tree
#[derive(Debug, Clone, Default)]
pub struct TreeTransformer {
    options: EnrichOptions,
}

impl TreeTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EnrichOptions) -> Self {
        Self { options }
    }

    /// Transform a plan root. Node ids are left unassigned.
    pub fn transform(&self, raw_root: &RawPlanNode) -> EnrichedNode {
        self.build(raw_root, None)
    }

    /// Transform a full EXPLAIN document (optionally array-wrapped)
    pub fn transform_document(&self, document: &Value) -> ParseResult<EnrichedNode> {
        let plan = DocumentParser::extract_plan(document)?;
        let tree = self.transform(plan);
        tracing::debug!("Transformed plan rooted at {}", tree.name);
        Ok(tree)
    }

    fn build(&self, raw: &RawPlanNode, parent: Option<&RawPlanNode>) -> EnrichedNode {
        let children = Self::child_plans(raw)
            .map(|child| self.build(child, Some(raw)))
            .collect();

        let mut raw_node = raw.clone();
        raw_node.remove(PLANS_FIELD);

        EnrichedNode {
            name: NodeEnricher::node_name(raw),
            id: None,
            details: NodeEnricher::enrich_with(raw, &self.options),
            children,
            edge_label: EdgeLabeler::label(raw, parent),
            is_on_critical_path: false,
            raw_node,
        }
    }

    /// Child plans in original order; malformed entries are skipped
    fn child_plans(raw: &RawPlanNode) -> impl Iterator<Item = &RawPlanNode> {
        let plans: &[Value] = match raw.get(PLANS_FIELD) {
            Some(Value::Array(plans)) => plans.as_slice(),
            Some(other) => {
                tracing::warn!("Ignoring non-array \"Plans\" field: {}", other);
                &[]
            }
            None => &[],
        };

        plans.iter().filter_map(|plan| {
            let child = plan.as_object();
            if child.is_none() {
                tracing::warn!("Ignoring non-object child plan: {}", plan);
            }
            child
        })
    }
}
