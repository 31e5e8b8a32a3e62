//! CTE cross-reference analysis
//!
//! Two passes over the enriched tree: collect definitions and scan sites,
//! then link scan sites that appeared before their definition.

use crate::services::plan_analyzer::models::constants::{
    CTE_SCAN_NODE, CTE_SUBPLAN_PREFIX, ROOT_ID_PREFIX,
};
use crate::services::plan_analyzer::models::{
    CteDefinition, CteMetadata, CteReference, EnrichedNode, detail_keys,
};
use crate::services::plan_analyzer::tree_utils::child_id;

/// Analyzer for CTE definitions and references
pub struct CteAnalyzer;

impl CteAnalyzer {
    /// Build the cross-reference map for a tree.
    ///
    /// Nodes without an id are identified by their position, which matches
    /// what id assignment would give them.
    pub fn analyze(root: &EnrichedNode) -> CteMetadata<'_> {
        let mut metadata = CteMetadata::default();
        Self::collect(root, ROOT_ID_PREFIX.to_string(), &mut metadata);

        let linked = Self::link_forward_references(&mut metadata);
        tracing::debug!(
            "CTE analysis: {} definitions, {} references ({} linked in second pass)",
            metadata.cte_definitions.len(),
            metadata.cte_references.len(),
            linked
        );

        metadata
    }

    /// Name defined by a node, from a subplan name like "CTE orders"
    pub fn defined_name(node: &EnrichedNode) -> Option<&str> {
        node.details
            .text(detail_keys::SUBPLAN_NAME)
            .and_then(|name| name.strip_prefix(CTE_SUBPLAN_PREFIX))
    }

    /// Name read by a `CTE Scan` node
    pub fn referenced_name(node: &EnrichedNode) -> Option<&str> {
        if node.name != CTE_SCAN_NODE {
            return None;
        }
        node.details.text(detail_keys::CTE_NAME)
    }

    fn collect<'a>(node: &'a EnrichedNode, position: String, metadata: &mut CteMetadata<'a>) {
        let node_id = node.id.clone().unwrap_or_else(|| position.clone());

        if let Some(name) = Self::defined_name(node) {
            if metadata.cte_definitions.contains_key(name) {
                tracing::warn!(
                    "Duplicate definition of CTE {} at node {}, keeping the first",
                    name,
                    node_id
                );
            } else {
                metadata.cte_definitions.insert(
                    name.to_string(),
                    CteDefinition {
                        cte_name: name.to_string(),
                        root_node_id: node_id.clone(),
                        root_node: node,
                    },
                );
            }
        }

        if let Some(name) = Self::referenced_name(node) {
            let target = metadata.cte_definitions.get(name).map(|d| d.root_node_id.clone());
            metadata.cte_references.push(CteReference {
                node_id: node_id.clone(),
                cte_name: name.to_string(),
                target_cte_node_id: target,
            });
        }

        for (index, child) in node.children.iter().enumerate() {
            Self::collect(child, child_id(&position, index), metadata);
        }
    }

    /// Resolve references left open by the first pass; returns how many were linked
    fn link_forward_references(metadata: &mut CteMetadata<'_>) -> usize {
        let mut linked = 0;
        for reference in metadata
            .cte_references
            .iter_mut()
            .filter(|r| r.target_cte_node_id.is_none())
        {
            if let Some(definition) = metadata.cte_definitions.get(&reference.cte_name) {
                reference.target_cte_node_id = Some(definition.root_node_id.clone());
                linked += 1;
            }
        }
        linked
    }
}

/// Convenience wrapper for [`CteAnalyzer::analyze`]
pub fn analyze_ctes(root: &EnrichedNode) -> CteMetadata<'_> {
    CteAnalyzer::analyze(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::plan_analyzer::parser::TreeTransformer;
    use crate::services::plan_analyzer::tree_utils::assign_node_ids;
    use serde_json::{Value, json};

    fn build(raw: Value) -> EnrichedNode {
        TreeTransformer::new().transform(raw.as_object().unwrap())
    }

    fn cte_scan(name: &str) -> Value {
        json!({"Node Type": "CTE Scan", "CTE Name": name, "Alias": name})
    }

    fn cte_definition(name: &str) -> Value {
        json!({
            "Node Type": "Seq Scan",
            "Parent Relationship": "InitPlan",
            "Subplan Name": format!("CTE {}", name),
            "Relation Name": name
        })
    }

    #[test]
    fn test_backward_reference_resolves_in_first_pass() {
        let tree = build(json!({
            "Node Type": "Nested Loop",
            "Plans": [cte_definition("orders"), cte_scan("orders")]
        }));
        let metadata = analyze_ctes(&tree);

        let definition = &metadata.cte_definitions["orders"];
        assert_eq!(definition.root_node_id, "0-0");
        assert_eq!(definition.root_node.details.text("relationName"), Some("orders"));
        assert_eq!(metadata.cte_references.len(), 1);
        assert_eq!(metadata.cte_references[0].node_id, "0-1");
        assert_eq!(metadata.cte_references[0].target_cte_node_id.as_deref(), Some("0-0"));
    }

    #[test]
    fn test_forward_reference_linked_in_second_pass() {
        let mut tree = build(json!({
            "Node Type": "Hash Join",
            "Plans": [
                cte_scan("orders"),
                {"Node Type": "Hash", "Plans": [cte_definition("orders")]}
            ]
        }));
        assign_node_ids(&mut tree, "0");
        let metadata = analyze_ctes(&tree);

        assert_eq!(metadata.cte_definitions["orders"].root_node_id, "0-1-0");
        assert_eq!(
            metadata.cte_references[0],
            CteReference {
                node_id: "0-0".to_string(),
                cte_name: "orders".to_string(),
                target_cte_node_id: Some("0-1-0".to_string()),
            }
        );
        assert_eq!(metadata.unresolved().count(), 0);
    }

    #[test]
    fn test_unknown_cte_stays_unlinked() {
        let tree = build(json!({
            "Node Type": "Append",
            "Plans": [cte_scan("ghost"), cte_definition("real"), cte_scan("real")]
        }));
        let metadata = analyze_ctes(&tree);

        assert_eq!(metadata.cte_references.len(), 2);
        assert_eq!(metadata.cte_references[0].target_cte_node_id, None);
        assert_eq!(metadata.cte_references[1].target_cte_node_id.as_deref(), Some("0-1"));
        assert_eq!(metadata.unresolved().count(), 1);
    }

    #[test]
    fn test_references_keep_traversal_order() {
        let tree = build(json!({
            "Node Type": "Append",
            "Plans": [cte_scan("a"), cte_scan("b"), cte_scan("a"), cte_definition("a")]
        }));
        let metadata = analyze_ctes(&tree);

        let order: Vec<&str> = metadata.cte_references.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(order, vec!["0-0", "0-1", "0-2"]);
        assert_eq!(metadata.references_to("a").count(), 2);
    }

    #[test]
    fn test_non_cte_subplans_and_scans_are_ignored() {
        let tree = build(json!({
            "Node Type": "Result",
            "Plans": [
                {"Node Type": "Seq Scan", "Subplan Name": "SubPlan 1"},
                {"Node Type": "Seq Scan", "CTE Name": "orders"},
                {"Node Type": "CTE Scan"}
            ]
        }));
        let metadata = analyze_ctes(&tree);

        assert!(metadata.cte_definitions.is_empty());
        assert!(metadata.cte_references.is_empty());
    }

    #[test]
    fn test_duplicate_definition_keeps_first() {
        let tree = build(json!({
            "Node Type": "Append",
            "Plans": [cte_definition("x"), cte_definition("x"), cte_scan("x")]
        }));
        let metadata = analyze_ctes(&tree);

        assert_eq!(metadata.cte_definitions.len(), 1);
        assert_eq!(metadata.cte_definitions["x"].root_node_id, "0-0");
        assert_eq!(metadata.cte_references[0].target_cte_node_id.as_deref(), Some("0-0"));
    }
}
