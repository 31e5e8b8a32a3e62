//! Edge labels between a plan node and its parent

use crate::services::plan_analyzer::models::RawPlanNode;

/// Derives the annotation drawn on the edge from a parent to a child
pub struct EdgeLabeler;

impl EdgeLabeler {
    /// Label for the edge into `node`; `None` for the root.
    ///
    /// First match wins: the parent's hash condition, the parent's join
    /// filter, then the child's own parent relationship ("Outer", "Inner",
    /// "SubPlan", ...).
    pub fn label(node: &RawPlanNode, parent: Option<&RawPlanNode>) -> Option<String> {
        let parent = parent?;

        Self::text(parent, "Hash Cond")
            .or_else(|| Self::text(parent, "Join Filter"))
            .or_else(|| Self::text(node, "Parent Relationship"))
            .map(str::to_string)
    }

    fn text<'a>(raw: &'a RawPlanNode, field: &str) -> Option<&'a str> {
        raw.get(field).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
    }
}
