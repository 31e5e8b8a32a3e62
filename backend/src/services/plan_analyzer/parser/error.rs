//! Parse errors for EXPLAIN plan documents

use thiserror::Error;

/// Errors raised while unwrapping an EXPLAIN document
///
/// Field-level absences inside a plan node are never errors; they are
/// defaulted by the enricher. Only the document shape itself can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("document has no \"Plan\" object")]
    MissingPlan,

    #[error("expected a JSON object, found {0}")]
    NotAnObject(String),

    #[error("EXPLAIN output is an empty array")]
    EmptyDocument,
}

pub type ParseResult<T> = Result<T, ParseError>;
