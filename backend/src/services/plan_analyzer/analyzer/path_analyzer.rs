//! Critical path analyzers
//!
//! Both variants share one depth-first descent and differ only in which
//! children a node hands the descent to:
//!
//! - execution time: the single child with the largest own metric
//!   (first child on ties), so exactly one leaf is reached;
//! - cost: every child, largest subtree metric first, with the best
//!   cumulative leaf kept across all explored paths (strict `>`, so the
//!   first path encountered wins ties).

use crate::services::plan_analyzer::analyzer::metrics::MetricExtractor;
use crate::services::plan_analyzer::models::EnrichedNode;
use crate::services::plan_analyzer::models::constants::ROOT_ID_PREFIX;
use crate::services::plan_analyzer::tree_utils::{child_id, node_at};
use serde::Serialize;
use std::cmp::Ordering;

/// Which children the descent explores at each node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescentPolicy {
    GreedyLocal,
    GlobalMax,
}

impl DescentPolicy {
    fn candidates(&self, node: &EnrichedNode, metric: &MetricExtractor) -> Vec<usize> {
        match self {
            DescentPolicy::GreedyLocal => {
                let mut best: Option<(usize, f64)> = None;
                for (index, child) in node.children.iter().enumerate() {
                    let value = metric(child);
                    if best.is_none_or(|(_, best_value)| value > best_value) {
                        best = Some((index, value));
                    }
                }
                best.map(|(index, _)| vec![index]).unwrap_or_default()
            }
            DescentPolicy::GlobalMax => {
                let subtree: Vec<f64> =
                    node.children.iter().map(|c| subtree_metric(c, metric)).collect();
                let mut order: Vec<usize> = (0..node.children.len()).collect();
                // Stable sort keeps original order among equal subtrees
                order.sort_by(|&a, &b| {
                    subtree[b].partial_cmp(&subtree[a]).unwrap_or(Ordering::Equal)
                });
                order
            }
        }
    }
}

/// A root-to-leaf path, stored as the child index taken at each hop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalPath {
    pub route: Vec<usize>,
    /// Metric accumulated from the root to the leaf
    pub total: f64,
}

impl CriticalPath {
    /// Number of nodes on the path, root and leaf included
    pub fn node_count(&self) -> usize {
        self.route.len() + 1
    }

    /// Resolve the path against the tree it was computed on
    pub fn nodes<'a>(&self, root: &'a EnrichedNode) -> Vec<&'a EnrichedNode> {
        let mut nodes = Vec::with_capacity(self.node_count());
        let mut current = Some(root);
        let mut hops = self.route.iter();

        while let Some(node) = current {
            nodes.push(node);
            current = hops.next().and_then(|&index| node.children.get(index));
        }
        nodes
    }

    /// Ids along the path; positional ids stand in for unassigned ones
    pub fn node_ids(&self, root: &EnrichedNode) -> Vec<String> {
        let mut position = ROOT_ID_PREFIX.to_string();
        let mut ids = Vec::with_capacity(self.node_count());

        for (depth, node) in self.nodes(root).into_iter().enumerate() {
            if depth > 0 {
                position = child_id(&position, self.route[depth - 1]);
            }
            ids.push(node.id.clone().unwrap_or_else(|| position.clone()));
        }
        ids
    }

    pub fn leaf<'a>(&self, root: &'a EnrichedNode) -> Option<&'a EnrichedNode> {
        node_at(root, &self.route)
    }
}

/// Node's own metric plus the largest subtree metric among its children
pub fn subtree_metric(node: &EnrichedNode, metric: &MetricExtractor) -> f64 {
    let best_child = node
        .children
        .iter()
        .map(|child| subtree_metric(child, metric))
        .fold(None, |best: Option<f64>, value| match best {
            Some(b) if b >= value => Some(b),
            _ => Some(value),
        });

    metric(node) + best_child.unwrap_or(0.0)
}

/// Greedy descent by each child's own metric; also used for custom metrics
pub fn analyze_execution_time(root: &mut EnrichedNode, metric: &MetricExtractor) -> CriticalPath {
    analyze_with(root, metric, DescentPolicy::GreedyLocal)
}

/// Best cumulative leaf over a subtree-ordered depth-first search
pub fn analyze_cost(root: &mut EnrichedNode, metric: &MetricExtractor) -> CriticalPath {
    analyze_with(root, metric, DescentPolicy::GlobalMax)
}

/// Compute the path and mark its nodes with `is_on_critical_path`.
///
/// Marks from earlier runs are left in place.
pub fn analyze_with(
    root: &mut EnrichedNode,
    metric: &MetricExtractor,
    policy: DescentPolicy,
) -> CriticalPath {
    let mut best: Option<CriticalPath> = None;
    let mut route = Vec::new();
    explore(root, metric, policy, &mut route, 0.0, &mut best);

    let path = best.unwrap_or_else(|| CriticalPath { route: Vec::new(), total: metric(root) });
    mark_path(root, &path.route);

    tracing::debug!(
        "Critical path ({:?}): {} nodes, total {:.3}",
        policy,
        path.node_count(),
        path.total
    );
    path
}

fn explore(
    node: &EnrichedNode,
    metric: &MetricExtractor,
    policy: DescentPolicy,
    route: &mut Vec<usize>,
    accumulated: f64,
    best: &mut Option<CriticalPath>,
) {
    let accumulated = accumulated + metric(node);

    if node.is_leaf() {
        if best.as_ref().is_none_or(|b| accumulated > b.total) {
            *best = Some(CriticalPath { route: route.clone(), total: accumulated });
        }
        return;
    }

    for index in policy.candidates(node, metric) {
        route.push(index);
        explore(&node.children[index], metric, policy, route, accumulated, best);
        route.pop();
    }
}

fn mark_path(root: &mut EnrichedNode, route: &[usize]) {
    let mut node = root;
    node.is_on_critical_path = true;
    for &index in route {
        node = &mut node.children[index];
        node.is_on_critical_path = true;
    }
}
