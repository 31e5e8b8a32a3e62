//! Generic traversal helpers over the enriched plan tree
//!
//! Ids are positional: the root is "0" and a child appends "-<index>",
//! so the second child of the root's first child is "0-0-1".

use crate::services::plan_analyzer::models::EnrichedNode;
use std::ptr;

/// Set `root.id = prefix` and recursively `prefix-<index>` for descendants
pub fn assign_node_ids(root: &mut EnrichedNode, prefix: &str) {
    for (index, child) in root.children.iter_mut().enumerate() {
        assign_node_ids(child, &child_id(prefix, index));
    }
    root.id = Some(prefix.to_string());
}

/// Id of the `index`-th child of the node with id `parent_id`
pub fn child_id(parent_id: &str, index: usize) -> String {
    format!("{}-{}", parent_id, index)
}

/// Depth-first pre-order traversal; the visitor gets `(node, depth, parent)`
pub fn walk_tree<'a, F>(root: &'a EnrichedNode, visitor: &mut F)
where
    F: FnMut(&'a EnrichedNode, usize, Option<&'a EnrichedNode>),
{
    walk(root, 0, None, visitor);
}

fn walk<'a, F>(
    node: &'a EnrichedNode,
    depth: usize,
    parent: Option<&'a EnrichedNode>,
    visitor: &mut F,
) where
    F: FnMut(&'a EnrichedNode, usize, Option<&'a EnrichedNode>),
{
    visitor(node, depth, parent);
    for child in &node.children {
        walk(child, depth + 1, Some(node), visitor);
    }
}

/// First node in document order carrying `id`
pub fn find_node_by_id<'a>(root: &'a EnrichedNode, id: &str) -> Option<&'a EnrichedNode> {
    if root.id.as_deref() == Some(id) {
        return Some(root);
    }
    root.children.iter().find_map(|child| find_node_by_id(child, id))
}

/// Nodes from `root` down to `target` inclusive.
///
/// `target` matches by reference or by (present) id.
pub fn get_path_to_node<'a>(
    root: &'a EnrichedNode,
    target: &EnrichedNode,
) -> Option<Vec<&'a EnrichedNode>> {
    let mut stack: Vec<(&'a EnrichedNode, usize)> = vec![(root, 0)];
    let mut path: Vec<&'a EnrichedNode> = Vec::new();

    while let Some((node, depth)) = stack.pop() {
        path.truncate(depth);
        path.push(node);

        if is_same_node(node, target) {
            return Some(path);
        }

        // Reverse so the first child is visited first
        for child in node.children.iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    None
}

fn is_same_node(node: &EnrichedNode, target: &EnrichedNode) -> bool {
    ptr::eq(node, target) || (node.id.is_some() && node.id == target.id)
}

/// Follow child indices from the root
pub fn node_at<'a>(root: &'a EnrichedNode, route: &[usize]) -> Option<&'a EnrichedNode> {
    route.iter().try_fold(root, |node, &index| node.children.get(index))
}

pub fn count_nodes(root: &EnrichedNode) -> usize {
    1 + root.children.iter().map(count_nodes).sum::<usize>()
}

/// Nodes without children, in document order
pub fn get_leaf_nodes(root: &EnrichedNode) -> Vec<&EnrichedNode> {
    let mut leaves = Vec::new();
    walk_tree(root, &mut |node, _, _| {
        if node.is_leaf() {
            leaves.push(node);
        }
    });
    leaves
}

/// Number of levels in the tree (1 for a lone root)
pub fn max_depth(root: &EnrichedNode) -> usize {
    1 + root.children.iter().map(max_depth).max().unwrap_or(0)
}

/// Clear critical-path marks left by a previous analysis run
pub fn reset_critical_path(root: &mut EnrichedNode) {
    root.is_on_critical_path = false;
    for child in &mut root.children {
        reset_critical_path(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::plan_analyzer::parser::TreeTransformer;
    use serde_json::{Value, json};
    use std::collections::HashSet;

    /// Nested Loop -> [Hash Join -> [Seq Scan, Hash -> [Seq Scan]], Index Scan]
    fn sample_tree() -> EnrichedNode {
        TreeTransformer::new().transform(sample_raw().as_object().unwrap())
    }

    fn sample_raw() -> Value {
        json!({
            "Node Type": "Nested Loop",
            "Plans": [
                {
                    "Node Type": "Hash Join",
                    "Plans": [
                        {"Node Type": "Seq Scan", "Relation Name": "a"},
                        {"Node Type": "Hash", "Plans": [
                            {"Node Type": "Seq Scan", "Relation Name": "b"}
                        ]}
                    ]
                },
                {"Node Type": "Index Scan", "Relation Name": "c"}
            ]
        })
    }

    /// Pre-order `(raw node without Plans, depth)` straight from the JSON nesting
    fn raw_preorder(raw: &Value, depth: usize, out: &mut Vec<(Value, usize)>) {
        let mut fields = raw.as_object().cloned().unwrap();
        let plans = fields.remove("Plans");
        out.push((Value::Object(fields), depth));

        for child in plans.as_ref().and_then(Value::as_array).into_iter().flatten() {
            raw_preorder(child, depth + 1, out);
        }
    }

    fn collect_ids(root: &EnrichedNode) -> Vec<String> {
        let mut ids = Vec::new();
        walk_tree(root, &mut |node, _, _| ids.push(node.id.clone().unwrap_or_default()));
        ids
    }

    #[test]
    fn test_assign_node_ids_positional() {
        let mut tree = sample_tree();
        assign_node_ids(&mut tree, "0");

        assert_eq!(collect_ids(&tree), vec!["0", "0-0", "0-0-0", "0-0-1", "0-0-1-0", "0-1"]);
    }

    #[test]
    fn test_assign_node_ids_idempotent() {
        let mut tree = sample_tree();
        assign_node_ids(&mut tree, "0");
        let first = collect_ids(&tree);
        assign_node_ids(&mut tree, "0");

        assert_eq!(first, collect_ids(&tree));
    }

    #[test]
    fn test_walk_tree_preorder_depth_and_parent() {
        let tree = sample_tree();
        let mut visits = Vec::new();
        walk_tree(&tree, &mut |node, depth, parent| {
            visits.push((node.name.clone(), depth, parent.map(|p| p.name.clone())));
        });

        assert_eq!(visits.len(), 6);
        assert_eq!(visits[0], ("Nested Loop".to_string(), 0, None));
        assert_eq!(visits[2], ("Seq Scan".to_string(), 2, Some("Hash Join".to_string())));
        assert_eq!(visits[4], ("Seq Scan".to_string(), 3, Some("Hash".to_string())));
        assert_eq!(visits[5], ("Index Scan".to_string(), 1, Some("Nested Loop".to_string())));
    }

    #[test]
    fn test_walk_tree_matches_raw_nesting() {
        let tree = sample_tree();
        let mut expected = Vec::new();
        raw_preorder(&sample_raw(), 0, &mut expected);

        let mut visited = Vec::new();
        walk_tree(&tree, &mut |node, depth, _| {
            visited.push((Value::Object(node.raw_node.clone()), depth));
        });

        assert_eq!(visited.len(), expected.len());
        for (index, (actual, wanted)) in visited.iter().zip(&expected).enumerate() {
            assert_eq!(actual, wanted, "pre-order mismatch at position {}", index);
        }
    }

    #[test]
    fn test_find_node_by_id() {
        let mut tree = sample_tree();
        assign_node_ids(&mut tree, "0");

        assert_eq!(find_node_by_id(&tree, "0-0-1").map(|n| n.name.as_str()), Some("Hash"));
        assert!(find_node_by_id(&tree, "0-7").is_none());
    }

    #[test]
    fn test_find_node_by_id_prefers_document_order() {
        let mut tree = sample_tree();
        tree.children[0].children[1].id = Some("dup".to_string());
        tree.children[1].id = Some("dup".to_string());

        assert_eq!(find_node_by_id(&tree, "dup").map(|n| n.name.as_str()), Some("Hash"));
    }

    #[test]
    fn test_get_path_to_node_by_reference() {
        let tree = sample_tree();
        let target = &tree.children[0].children[1].children[0];
        let path = get_path_to_node(&tree, target).unwrap();

        let names: Vec<&str> = path.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Nested Loop", "Hash Join", "Hash", "Seq Scan"]);
    }

    #[test]
    fn test_get_path_to_node_by_id_and_missing() {
        let mut tree = sample_tree();
        assign_node_ids(&mut tree, "0");

        let mut probe = tree.children[1].clone();
        probe.children.clear();
        let path = get_path_to_node(&tree, &probe).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1].name, "Index Scan");

        let mut stranger = probe.clone();
        stranger.id = Some("9-9".to_string());
        assert!(get_path_to_node(&tree, &stranger).is_none());
    }

    #[test]
    fn test_count_nodes_recursive_identity() {
        let tree = sample_tree();
        let mut checked = 0;
        walk_tree(&tree, &mut |node, _, _| {
            let children: usize = node.children.iter().map(count_nodes).sum();
            assert_eq!(count_nodes(node), 1 + children);
            checked += 1;
        });

        assert_eq!(checked, 6);
        assert_eq!(count_nodes(&tree), 6);
    }

    #[test]
    fn test_get_leaf_nodes() {
        let mut tree = sample_tree();
        assign_node_ids(&mut tree, "0");
        let leaves = get_leaf_nodes(&tree);

        let ids: Vec<&str> = leaves.iter().filter_map(|n| n.id.as_deref()).collect();
        assert_eq!(ids, vec!["0-0-0", "0-0-1-0", "0-1"]);
        assert!(leaves.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_get_leaf_nodes_ids_are_unique() {
        let mut tree = sample_tree();
        assign_node_ids(&mut tree, "0");

        let ids: Vec<&str> = get_leaf_nodes(&tree).iter().filter_map(|n| n.id.as_deref()).collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();

        assert_eq!(ids.len(), 3);
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_node_at_and_max_depth() {
        let tree = sample_tree();

        assert_eq!(node_at(&tree, &[0, 1]).map(|n| n.name.as_str()), Some("Hash"));
        assert_eq!(node_at(&tree, &[]).map(|n| n.name.as_str()), Some("Nested Loop"));
        assert!(node_at(&tree, &[3]).is_none());
        assert_eq!(max_depth(&tree), 4);
    }

    #[test]
    fn test_reset_critical_path() {
        let mut tree = sample_tree();
        tree.is_on_critical_path = true;
        tree.children[0].children[1].is_on_critical_path = true;
        reset_critical_path(&mut tree);

        let mut marked = 0;
        walk_tree(&tree, &mut |node, _, _| {
            if node.is_on_critical_path {
                marked += 1;
            }
        });
        assert_eq!(marked, 0);
    }
}
