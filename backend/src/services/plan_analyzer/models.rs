//! Plan analysis data models
//!
//! These models represent the normalized view of a PostgreSQL EXPLAIN plan.
//! They are designed to be serializable for the rendering layer (graph and grid views).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A raw plan node as emitted by `EXPLAIN (FORMAT JSON)`, keyed by display names
/// such as `"Node Type"` or `"Total Cost"`.
pub type RawPlanNode = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Enriched Tree
// ============================================================================

/// A node in the enriched plan tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedNode {
    /// Node type label, e.g. "Seq Scan"
    pub name: String,
    /// Positional id ("0", "0-1", "0-1-0", ...), assigned lazily
    #[serde(default)]
    pub id: Option<String>,
    pub details: NodeDetails,
    #[serde(default)]
    pub children: Vec<EnrichedNode>,
    #[serde(default)]
    pub edge_label: Option<String>,
    #[serde(default)]
    pub is_on_critical_path: bool,
    /// Original fields of this node, without the nested `Plans` list
    #[serde(default)]
    pub raw_node: RawPlanNode,
}

impl EnrichedNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Classification used by the rendering layer to pick node styling
    pub fn kind(&self) -> NodeKind {
        NodeKind::from_name(&self.name)
    }

    /// Read a numeric field straight from the raw node
    pub fn raw_f64(&self, field: &str) -> Option<f64> {
        self.raw_node.get(field).and_then(|v| v.as_f64())
    }

    /// Label for tree and grid views, e.g. "Index Scan on public.orders using orders_pkey"
    pub fn display_label(&self) -> String {
        let mut label = self.name.clone();

        if let Some(relation) = self.details.text(detail_keys::RELATION_NAME) {
            match self.details.text(detail_keys::SCHEMA) {
                Some(schema) => label = format!("{} on {}.{}", label, schema, relation),
                None => label = format!("{} on {}", label, relation),
            }
        }

        if let Some(index) = self.details.text(detail_keys::INDEX_NAME) {
            label = format!("{} using {}", label, index);
        }

        if let Some(cte) = self.details.text(detail_keys::CTE_NAME) {
            label = format!("{} ({})", label, cte);
        }

        label
    }
}

/// Scalar value of a normalized detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl DetailValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DetailValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DetailValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DetailValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DetailValue::Integer(n) => Some(*n as f64),
            DetailValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DetailValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Normalized, camel-cased details of a node
///
/// The key set is closed: every node carries exactly the keys produced by the
/// enricher's decoding table plus the computed metrics, whatever its type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeDetails(BTreeMap<String, DetailValue>);

impl NodeDetails {
    pub fn insert(&mut self, key: &str, value: DetailValue) {
        self.0.insert(key.to_string(), value);
    }

    /// `None` only for keys outside the recognized set
    pub fn get(&self, key: &str) -> Option<&DetailValue> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(DetailValue::as_str)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(DetailValue::as_i64)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(DetailValue::as_f64)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(DetailValue::as_bool)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Node Classification
// ============================================================================

/// Node type classification for visualization styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeKind {
    SeqScan,
    IndexScan,
    IndexOnlyScan,
    BitmapScan,
    FunctionScan,
    CteScan,
    SubqueryScan,
    HashJoin,
    MergeJoin,
    NestedLoop,
    Hash,
    Aggregate,
    Sort,
    Materialize,
    Limit,
    Append,
    Gather,
    Result,
    Modify,
    #[default]
    Other,
}

static NODE_KIND_TABLE: Lazy<HashMap<&'static str, NodeKind>> = Lazy::new(|| {
    HashMap::from([
        ("Seq Scan", NodeKind::SeqScan),
        ("Parallel Seq Scan", NodeKind::SeqScan),
        ("Index Scan", NodeKind::IndexScan),
        ("Index Only Scan", NodeKind::IndexOnlyScan),
        ("Bitmap Heap Scan", NodeKind::BitmapScan),
        ("Bitmap Index Scan", NodeKind::BitmapScan),
        ("BitmapAnd", NodeKind::BitmapScan),
        ("BitmapOr", NodeKind::BitmapScan),
        ("Function Scan", NodeKind::FunctionScan),
        ("Values Scan", NodeKind::FunctionScan),
        ("CTE Scan", NodeKind::CteScan),
        ("WorkTable Scan", NodeKind::CteScan),
        ("Subquery Scan", NodeKind::SubqueryScan),
        ("Hash Join", NodeKind::HashJoin),
        ("Merge Join", NodeKind::MergeJoin),
        ("Nested Loop", NodeKind::NestedLoop),
        ("Hash", NodeKind::Hash),
        ("Aggregate", NodeKind::Aggregate),
        ("HashAggregate", NodeKind::Aggregate),
        ("GroupAggregate", NodeKind::Aggregate),
        ("WindowAgg", NodeKind::Aggregate),
        ("Sort", NodeKind::Sort),
        ("Incremental Sort", NodeKind::Sort),
        ("Materialize", NodeKind::Materialize),
        ("Memoize", NodeKind::Materialize),
        ("Limit", NodeKind::Limit),
        ("Append", NodeKind::Append),
        ("Merge Append", NodeKind::Append),
        ("Recursive Union", NodeKind::Append),
        ("Gather", NodeKind::Gather),
        ("Gather Merge", NodeKind::Gather),
        ("Result", NodeKind::Result),
        ("ModifyTable", NodeKind::Modify),
    ])
});

impl NodeKind {
    /// Classify a node type label; unlisted labels fall back to `Other`
    pub fn from_name(name: &str) -> Self {
        NODE_KIND_TABLE.get(name).copied().unwrap_or_default()
    }

    pub fn is_scan(&self) -> bool {
        matches!(
            self,
            NodeKind::SeqScan
                | NodeKind::IndexScan
                | NodeKind::IndexOnlyScan
                | NodeKind::BitmapScan
                | NodeKind::FunctionScan
                | NodeKind::CteScan
                | NodeKind::SubqueryScan
        )
    }

    pub fn is_join(&self) -> bool {
        matches!(self, NodeKind::HashJoin | NodeKind::MergeJoin | NodeKind::NestedLoop)
    }
}

// ============================================================================
// CTE Cross-Reference
// ============================================================================

/// CTE definitions and their scan sites within one tree
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CteMetadata<'a> {
    pub cte_definitions: BTreeMap<String, CteDefinition<'a>>,
    pub cte_references: Vec<CteReference>,
}

impl<'a> CteMetadata<'a> {
    /// All scan sites of one CTE, in traversal order
    pub fn references_to<'m>(
        &'m self,
        cte_name: &'m str,
    ) -> impl Iterator<Item = &'m CteReference> {
        self.cte_references.iter().filter(move |r| r.cte_name == cte_name)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &CteReference> {
        self.cte_references.iter().filter(|r| r.target_cte_node_id.is_none())
    }
}

/// A node whose subplan defines a CTE
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CteDefinition<'a> {
    pub cte_name: String,
    pub root_node_id: String,
    #[serde(skip)]
    pub root_node: &'a EnrichedNode,
}

/// A `CTE Scan` node and the definition it reads from, if known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CteReference {
    pub node_id: String,
    pub cte_name: String,
    pub target_cte_node_id: Option<String>,
}

// ============================================================================
// Analysis Results
// ============================================================================

/// Document-level facts about a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    pub total_nodes: usize,
    pub max_depth: usize,
    pub total_cost: f64,
    /// Whether the plan was produced with ANALYZE (actual timings present)
    pub has_actual_timing: bool,
}

/// The dominant root-to-leaf path as reported to the rendering layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPathSummary {
    pub node_ids: Vec<String>,
    pub total: f64,
}

/// Complete analysis response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAnalysisResponse {
    pub summary: PlanSummary,
    /// Metric the critical path was computed with ("time" or "cost")
    pub metric: String,
    pub critical_path: CriticalPathSummary,
    pub tree: EnrichedNode,
}

// ============================================================================
// Constants
// ============================================================================

pub mod constants {
    /// Default factor outside of which an estimate counts as off
    pub const DEFAULT_ESTIMATION_THRESHOLD: f64 = 2.0;
    /// Id of the root node; children append "-<index>"
    pub const ROOT_ID_PREFIX: &str = "0";
    /// Subplan names of CTE definitions start with this prefix
    pub const CTE_SUBPLAN_PREFIX: &str = "CTE ";
    pub const CTE_SCAN_NODE: &str = "CTE Scan";
    /// Placeholder for pre-formatted numbers that are absent
    pub const NOT_AVAILABLE: &str = "N/A";
    pub const UNKNOWN_NODE: &str = "Unknown";
    /// Raw field holding child plans
    pub const PLANS_FIELD: &str = "Plans";
}

/// Keys of `NodeDetails` that other components read by name
pub mod detail_keys {
    pub const COST: &str = "cost";
    pub const ACTUAL_TIME: &str = "actualTime";
    pub const PLAN_ROWS: &str = "planRows";
    pub const ACTUAL_ROWS: &str = "actualRows";
    pub const RELATION_NAME: &str = "relationName";
    pub const SCHEMA: &str = "schema";
    pub const INDEX_NAME: &str = "indexName";
    pub const SHARED_HIT_BLOCKS: &str = "sharedHitBlocks";
    pub const SHARED_READ_BLOCKS: &str = "sharedReadBlocks";
    pub const ROWS_REMOVED_BY_FILTER: &str = "rowsRemovedByFilter";
    pub const CTE_NAME: &str = "cteName";
    pub const SUBPLAN_NAME: &str = "subplanName";
    pub const ESTIMATION_ACCURACY: &str = "estimationAccuracy";
    pub const ESTIMATION_OFF: &str = "estimationOff";
    pub const BUFFER_HIT_RATE: &str = "bufferHitRate";
    pub const SELECTIVITY: &str = "selectivity";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_lookup() {
        assert_eq!(NodeKind::from_name("Seq Scan"), NodeKind::SeqScan);
        assert_eq!(NodeKind::from_name("Gather Merge"), NodeKind::Gather);
        assert_eq!(NodeKind::from_name("Custom Scan"), NodeKind::Other);
        assert!(NodeKind::from_name("CTE Scan").is_scan());
        assert!(NodeKind::from_name("Nested Loop").is_join());
        assert!(!NodeKind::from_name("Hash").is_join());
    }

    #[test]
    fn test_detail_value_serializes_as_scalar() {
        let mut details = NodeDetails::default();
        details.insert("cost", DetailValue::Text("12.50".to_string()));
        details.insert("planRows", DetailValue::Integer(7));
        details.insert("filter", DetailValue::Null);

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["cost"], "12.50");
        assert_eq!(json["planRows"], 7);
        assert!(json["filter"].is_null());
        assert_eq!(details.number("planRows"), Some(7.0));
        assert_eq!(details.text("filter"), None);
        assert!(details.contains_key("filter"));
    }
}
