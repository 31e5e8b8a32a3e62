//! Node enricher for PostgreSQL plan nodes
//!
//! Maps one raw plan node onto the closed set of camel-cased detail keys.
//! Every recognized key is decoded through a single table, so the output
//! shape never depends on the node type.

use crate::services::plan_analyzer::models::constants::{
    DEFAULT_ESTIMATION_THRESHOLD, NOT_AVAILABLE, UNKNOWN_NODE,
};
use crate::services::plan_analyzer::models::{DetailValue, NodeDetails, RawPlanNode, detail_keys};
use serde_json::Value;

/// How a raw field is turned into a detail value
#[derive(Debug, Clone, Copy, PartialEq)]
enum Decode {
    /// Number pre-formatted with fixed precision; "N/A" when absent
    Fixed(usize),
    /// Counter; 0 when absent
    Count,
    /// Fractional quantity; null when absent
    Float,
    /// Free text; null when absent
    Text,
    /// List of strings joined with ", "; null when absent
    List,
    /// Boolean; null when absent
    Flag,
}

/// One row of the decoding table: raw field name -> detail key
struct FieldSpec {
    raw: &'static str,
    key: &'static str,
    decode: Decode,
}

const fn field(raw: &'static str, key: &'static str, decode: Decode) -> FieldSpec {
    FieldSpec { raw, key, decode }
}

const DETAIL_FIELDS: &[FieldSpec] = &[
    // Cost and timing
    field("Total Cost", detail_keys::COST, Decode::Fixed(2)),
    field("Startup Cost", "startupCost", Decode::Fixed(2)),
    field("Actual Total Time", detail_keys::ACTUAL_TIME, Decode::Fixed(3)),
    field("Actual Startup Time", "actualStartupTime", Decode::Fixed(3)),
    field("Actual Loops", "actualLoops", Decode::Count),
    // Row counts
    field("Plan Rows", detail_keys::PLAN_ROWS, Decode::Count),
    field("Actual Rows", detail_keys::ACTUAL_ROWS, Decode::Count),
    field("Rows Removed by Filter", detail_keys::ROWS_REMOVED_BY_FILTER, Decode::Count),
    field("Rows Removed by Join Filter", "rowsRemovedByJoinFilter", Decode::Count),
    // Relation access
    field("Relation Name", detail_keys::RELATION_NAME, Decode::Text),
    field("Alias", "alias", Decode::Text),
    field("Schema", detail_keys::SCHEMA, Decode::Text),
    field("Index Name", detail_keys::INDEX_NAME, Decode::Text),
    field("Index Cond", "indexCondition", Decode::Text),
    field("Recheck Cond", "recheckCondition", Decode::Text),
    field("Heap Fetches", "heapFetches", Decode::Count),
    field("Exact Heap Blocks", "exactHeapBlocks", Decode::Count),
    field("Lossy Heap Blocks", "lossyHeapBlocks", Decode::Count),
    // Joins and filters
    field("Join Type", "joinType", Decode::Text),
    field("Hash Cond", "hashCondition", Decode::Text),
    field("Merge Cond", "mergeCondition", Decode::Text),
    field("Join Filter", "joinFilter", Decode::Text),
    field("Inner Unique", "innerUnique", Decode::Flag),
    field("Parent Relationship", "parentRelationship", Decode::Text),
    field("Filter", "filter", Decode::Text),
    // Sort
    field("Sort Key", "sortKey", Decode::List),
    field("Sort Method", "sortMethod", Decode::Text),
    field("Sort Space Used", "sortSpaceUsed", Decode::Count),
    field("Sort Space Type", "sortSpaceType", Decode::Text),
    // Aggregate and hash
    field("Strategy", "strategy", Decode::Text),
    field("Group Key", "groupKey", Decode::List),
    field("HashAgg Batches", "hashAggBatches", Decode::Count),
    field("Peak Memory Usage", "peakMemoryUsage", Decode::Count),
    field("Hash Buckets", "hashBuckets", Decode::Count),
    field("Hash Batches", "hashBatches", Decode::Count),
    // Buffers
    field("Shared Hit Blocks", detail_keys::SHARED_HIT_BLOCKS, Decode::Count),
    field("Shared Read Blocks", detail_keys::SHARED_READ_BLOCKS, Decode::Count),
    field("Shared Dirtied Blocks", "sharedDirtiedBlocks", Decode::Count),
    field("Shared Written Blocks", "sharedWrittenBlocks", Decode::Count),
    field("Local Hit Blocks", "localHitBlocks", Decode::Count),
    field("Local Read Blocks", "localReadBlocks", Decode::Count),
    field("Temp Read Blocks", "tempReadBlocks", Decode::Count),
    field("Temp Written Blocks", "tempWrittenBlocks", Decode::Count),
    // I/O timing (track_io_timing)
    field("I/O Read Time", "ioReadTime", Decode::Float),
    field("I/O Write Time", "ioWriteTime", Decode::Float),
    // Parallelism
    field("Workers Planned", "workersPlanned", Decode::Count),
    field("Workers Launched", "workersLaunched", Decode::Count),
    // Output and subplans
    field("Output", "output", Decode::List),
    field("CTE Name", detail_keys::CTE_NAME, Decode::Text),
    field("Subplan Name", detail_keys::SUBPLAN_NAME, Decode::Text),
];

/// Detail keys computed from other fields rather than decoded
const COMPUTED_KEYS: &[&str] = &[
    detail_keys::ESTIMATION_ACCURACY,
    detail_keys::ESTIMATION_OFF,
    detail_keys::BUFFER_HIT_RATE,
    detail_keys::SELECTIVITY,
];

/// Options for enrichment
#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    /// Factor outside of which `actualRows / planRows` counts as a misestimate
    pub estimation_threshold: f64,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self { estimation_threshold: DEFAULT_ESTIMATION_THRESHOLD }
    }
}

/// Enricher for raw plan nodes
pub struct NodeEnricher;

impl NodeEnricher {
    /// Enrich with default options
    pub fn enrich(raw: &RawPlanNode) -> NodeDetails {
        Self::enrich_with(raw, &EnrichOptions::default())
    }

    /// Decode every recognized field and compute derived metrics
    pub fn enrich_with(raw: &RawPlanNode, options: &EnrichOptions) -> NodeDetails {
        let mut details = NodeDetails::default();

        for spec in DETAIL_FIELDS {
            details.insert(spec.key, Self::decode(raw.get(spec.raw), spec.decode));
        }

        let plan_rows = Self::number(raw, "Plan Rows").unwrap_or(0.0);
        let actual_rows = Self::number(raw, "Actual Rows").unwrap_or(0.0);

        let accuracy = Self::estimation_accuracy(plan_rows, actual_rows);
        details.insert(detail_keys::ESTIMATION_ACCURACY, DetailValue::Number(accuracy));
        details.insert(
            detail_keys::ESTIMATION_OFF,
            DetailValue::Bool(Self::is_estimation_off(accuracy, options.estimation_threshold)),
        );
        details.insert(
            detail_keys::BUFFER_HIT_RATE,
            Self::buffer_hit_rate(raw).map_or(DetailValue::Null, DetailValue::Number),
        );
        details.insert(
            detail_keys::SELECTIVITY,
            Self::selectivity(raw, actual_rows).map_or(DetailValue::Null, DetailValue::Number),
        );

        details
    }

    /// Node type label, "Unknown" when absent
    pub fn node_name(raw: &RawPlanNode) -> String {
        raw.get("Node Type")
            .and_then(|v| v.as_str())
            .unwrap_or(UNKNOWN_NODE)
            .to_string()
    }

    /// Every key an enriched node carries, in table order
    pub fn recognized_keys() -> impl Iterator<Item = &'static str> {
        DETAIL_FIELDS.iter().map(|spec| spec.key).chain(COMPUTED_KEYS.iter().copied())
    }

    /// `actual / plan`, or 1.0 when nothing was planned
    pub fn estimation_accuracy(plan_rows: f64, actual_rows: f64) -> f64 {
        if plan_rows > 0.0 { actual_rows / plan_rows } else { 1.0 }
    }

    pub fn is_estimation_off(accuracy: f64, threshold: f64) -> bool {
        accuracy < 1.0 / threshold || accuracy > threshold
    }

    fn buffer_hit_rate(raw: &RawPlanNode) -> Option<f64> {
        let hit = Self::number(raw, "Shared Hit Blocks").unwrap_or(0.0);
        let read = Self::number(raw, "Shared Read Blocks").unwrap_or(0.0);
        let total = hit + read;
        (total > 0.0).then(|| hit / total)
    }

    /// Fraction of scanned rows that survived the filter
    fn selectivity(raw: &RawPlanNode, actual_rows: f64) -> Option<f64> {
        let removed = Self::number(raw, "Rows Removed by Filter")?;
        let scanned = actual_rows + removed;
        (scanned > 0.0).then(|| actual_rows / scanned)
    }

    fn number(raw: &RawPlanNode, field: &str) -> Option<f64> {
        raw.get(field).and_then(|v| v.as_f64())
    }

    fn decode(value: Option<&Value>, decode: Decode) -> DetailValue {
        match decode {
            Decode::Fixed(precision) => match value.and_then(Value::as_f64) {
                Some(n) => DetailValue::Text(format!("{:.*}", precision, n)),
                None => DetailValue::Text(NOT_AVAILABLE.to_string()),
            },
            Decode::Count => match value {
                Some(v) if v.is_i64() || v.is_u64() => {
                    DetailValue::Integer(v.as_i64().unwrap_or(i64::MAX))
                }
                Some(v) if v.is_f64() => DetailValue::Number(v.as_f64().unwrap_or(0.0)),
                _ => DetailValue::Integer(0),
            },
            Decode::Float => value
                .and_then(Value::as_f64)
                .map_or(DetailValue::Null, DetailValue::Number),
            Decode::Text => value
                .and_then(Value::as_str)
                .map_or(DetailValue::Null, |s| DetailValue::Text(s.to_string())),
            Decode::List => match value {
                Some(Value::Array(items)) => DetailValue::Text(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                Some(Value::String(s)) => DetailValue::Text(s.clone()),
                _ => DetailValue::Null,
            },
            Decode::Flag => value
                .and_then(Value::as_bool)
                .map_or(DetailValue::Null, DetailValue::Bool),
        }
    }
}
