//! Critical path facade
//!
//! Picks the analyzer for a metric selector and makes sure the tree carries
//! ids before the path is computed.

use crate::services::plan_analyzer::analyzer::metrics::{
    MetricExtractor, MetricKind, execution_time, total_cost,
};
use crate::services::plan_analyzer::analyzer::path_analyzer::{
    CriticalPath, analyze_cost, analyze_execution_time,
};
use crate::services::plan_analyzer::models::EnrichedNode;
use crate::services::plan_analyzer::models::constants::ROOT_ID_PREFIX;
use crate::services::plan_analyzer::tree_utils::assign_node_ids;
use crate::utils::error::{PlanError, PlanResult};

/// Compute and mark the critical path for `metric`.
///
/// `Time` and `Custom` use the greedy execution-time descent, `Cost` the
/// global cost search. `Custom` requires `custom`. Ids are assigned only when
/// the root has none, so pre-assigned ids are never overwritten.
pub fn calculate_critical_path(
    root: &mut EnrichedNode,
    metric: MetricKind,
    custom: Option<&MetricExtractor>,
) -> PlanResult<CriticalPath> {
    let custom = match metric {
        MetricKind::Custom => Some(custom.ok_or(PlanError::MissingCustomExtractor)?),
        _ => None,
    };

    if root.id.is_none() {
        assign_node_ids(root, ROOT_ID_PREFIX);
    }

    let path = match (metric, custom) {
        (MetricKind::Cost, _) => analyze_cost(root, &total_cost),
        (MetricKind::Custom, Some(extractor)) => analyze_execution_time(root, extractor),
        _ => analyze_execution_time(root, &execution_time),
    };
    Ok(path)
}

/// Same as [`calculate_critical_path`] with the selector given by name
pub fn calculate_critical_path_by_name(
    root: &mut EnrichedNode,
    metric: &str,
    custom: Option<&MetricExtractor>,
) -> PlanResult<CriticalPath> {
    calculate_critical_path(root, metric.parse()?, custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::plan_analyzer::parser::TreeTransformer;
    use crate::services::plan_analyzer::tree_utils::{find_node_by_id, walk_tree};
    use serde_json::json;

    fn sample_tree() -> EnrichedNode {
        let raw = json!({
            "Node Type": "Hash Join",
            "Total Cost": 100.0,
            "Actual Total Time": 40.0,
            "Plans": [
                {"Node Type": "Seq Scan", "Total Cost": 30.0, "Actual Total Time": 25.0},
                {"Node Type": "Hash", "Total Cost": 60.0, "Actual Total Time": 5.0, "Plans": [
                    {"Node Type": "Seq Scan", "Total Cost": 55.0, "Actual Total Time": 4.0}
                ]}
            ]
        });
        TreeTransformer::new().transform(raw.as_object().unwrap())
    }

    #[test]
    fn test_assigns_ids_when_missing() {
        let mut tree = sample_tree();
        let path = calculate_critical_path(&mut tree, MetricKind::Time, None).unwrap();

        assert_eq!(tree.id.as_deref(), Some("0"));
        assert!(find_node_by_id(&tree, "0-1-0").is_some());
        assert_eq!(path.node_ids(&tree), vec!["0", "0-0"]);
    }

    #[test]
    fn test_existing_ids_are_preserved() {
        let mut tree = sample_tree();
        tree.id = Some("plan".to_string());
        calculate_critical_path(&mut tree, MetricKind::Cost, None).unwrap();

        assert_eq!(tree.id.as_deref(), Some("plan"));
        assert!(tree.children[0].id.is_none());
    }

    #[test]
    fn test_time_and_cost_dispatch() {
        let mut by_time = sample_tree();
        let time_path = calculate_critical_path(&mut by_time, MetricKind::Time, None).unwrap();
        assert_eq!(time_path.route, vec![0]);
        assert_eq!(time_path.total, 65.0);

        let mut by_cost = sample_tree();
        let cost_path = calculate_critical_path(&mut by_cost, MetricKind::Cost, None).unwrap();
        assert_eq!(cost_path.route, vec![1, 0]);
        assert_eq!(cost_path.total, 215.0);
    }

    #[test]
    fn test_custom_metric_uses_extractor() {
        let mut tree = sample_tree();
        let rows = |node: &EnrichedNode| if node.name == "Hash" { 1000.0 } else { 1.0 };
        let path = calculate_critical_path(&mut tree, MetricKind::Custom, Some(&rows)).unwrap();

        assert_eq!(path.route, vec![1, 0]);
    }

    #[test]
    fn test_custom_without_extractor_fails() {
        let mut tree = sample_tree();
        let err = calculate_critical_path(&mut tree, MetricKind::Custom, None).unwrap_err();

        assert!(matches!(err, PlanError::MissingCustomExtractor));
        assert!(tree.id.is_none());
        assert!(!tree.is_on_critical_path);
    }

    #[test]
    fn test_unknown_metric_name_fails() {
        let mut tree = sample_tree();
        let err = calculate_critical_path_by_name(&mut tree, "memory", None).unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedMetric(_)));

        assert!(calculate_critical_path_by_name(&mut tree, "cost", None).is_ok());
    }

    #[test]
    fn test_path_runs_from_root_to_leaf() {
        for metric in [MetricKind::Time, MetricKind::Cost] {
            let mut tree = sample_tree();
            let path = calculate_critical_path(&mut tree, metric, None).unwrap();
            let nodes = path.nodes(&tree);

            assert!(std::ptr::eq(nodes[0], &tree));
            assert!(nodes.last().unwrap().is_leaf());

            let leaf_id = nodes.last().unwrap().id.clone();
            let mut leaf_depth = None;
            walk_tree(&tree, &mut |node, depth, _| {
                if node.id == leaf_id {
                    leaf_depth = Some(depth);
                }
            });
            assert_eq!(path.node_count(), leaf_depth.unwrap() + 1);
        }
    }
}
