//! Document parser for EXPLAIN (FORMAT JSON) output
//!
//! Unwraps the outer array PostgreSQL emits and locates the `Plan` root.

use crate::services::plan_analyzer::models::RawPlanNode;
use crate::services::plan_analyzer::parser::error::{ParseError, ParseResult};
use serde_json::Value;

/// Parser for the document wrapped around a plan tree
pub struct DocumentParser;

impl DocumentParser {
    /// Parse EXPLAIN output text, tolerating psql's aligned table format
    /// (`QUERY PLAN` header, `+` continuation markers, row-count footer)
    pub fn parse_str(text: &str) -> ParseResult<Value> {
        let cleaned = Self::strip_cell_markers(text);
        let json = Self::extract_json(&cleaned)?;

        serde_json::Deserializer::from_str(json)
            .into_iter::<Value>()
            .next()
            .ok_or_else(|| ParseError::InvalidJson("no JSON value found".to_string()))?
            .map_err(|e| ParseError::InvalidJson(e.to_string()))
    }

    /// The document object, unwrapping a single-element array
    pub fn unwrap_document(document: &Value) -> ParseResult<&RawPlanNode> {
        let inner = match document {
            Value::Array(items) => {
                if items.len() > 1 {
                    tracing::warn!(
                        "EXPLAIN output holds {} documents, using the first",
                        items.len()
                    );
                }
                items.first().ok_or(ParseError::EmptyDocument)?
            }
            other => other,
        };

        inner
            .as_object()
            .ok_or_else(|| ParseError::NotAnObject(Self::describe(inner)))
    }

    /// The root plan node of a document
    pub fn extract_plan(document: &Value) -> ParseResult<&RawPlanNode> {
        Self::unwrap_document(document)?
            .get("Plan")
            .and_then(Value::as_object)
            .ok_or(ParseError::MissingPlan)
    }

    /// `Planning Time` and `Execution Time` in milliseconds, when present
    pub fn timings(document: &Value) -> (Option<f64>, Option<f64>) {
        match Self::unwrap_document(document) {
            Ok(doc) => (
                doc.get("Planning Time").and_then(Value::as_f64),
                doc.get("Execution Time").and_then(Value::as_f64),
            ),
            Err(_) => (None, None),
        }
    }

    /// Drop the trailing `+` psql appends to every line of a multi-line cell.
    ///
    /// A JSON line can never end in `+`, so plain JSON passes through unchanged.
    fn strip_cell_markers(text: &str) -> String {
        text.lines()
            .map(|line| {
                let line = line.trim_end();
                line.strip_suffix('+').map_or(line, str::trim_end)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Slice starting at the first JSON array or object
    fn extract_json(text: &str) -> ParseResult<&str> {
        let text = text.trim();
        text.find(['[', '{'])
            .map(|start| &text[start..])
            .ok_or_else(|| ParseError::InvalidJson("no JSON array or object found".to_string()))
    }

    fn describe(value: &Value) -> String {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        }
        .to_string()
    }
}
