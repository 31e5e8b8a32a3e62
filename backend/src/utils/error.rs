use serde::Serialize;
use thiserror::Error;

use crate::services::plan_analyzer::parser::error::ParseError;

/// Crate-level error for plan analysis
#[derive(Error, Debug)]
pub enum PlanError {
    // Input errors 1xxx
    #[error("Malformed plan: {0}")]
    Parse(#[from] ParseError),

    // Configuration errors 2xxx
    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),

    #[error("Custom metric requested without an extractor")]
    MissingCustomExtractor,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PlanError {
    /// Helper to create unsupported metric error
    pub fn unsupported_metric(metric: impl Into<String>) -> Self {
        Self::UnsupportedMetric(metric.into())
    }

    /// Helper to create invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Stable numeric code, grouped by category
    pub fn error_code(&self) -> i32 {
        match self {
            // Input errors 1xxx
            Self::Parse(ParseError::InvalidJson(_)) => 1001,
            Self::Parse(ParseError::MissingPlan) => 1002,
            Self::Parse(ParseError::NotAnObject(_)) => 1003,
            Self::Parse(ParseError::EmptyDocument) => 1004,

            // Configuration errors 2xxx
            Self::UnsupportedMetric(_) => 2001,
            Self::MissingCustomExtractor => 2002,
            Self::InvalidConfig(_) => 2003,
        }
    }
}

/// Serializable error body for callers that report failures as JSON
#[derive(Debug, Serialize)]
pub struct PlanErrorResponse {
    pub code: i32,
    pub message: String,
}

impl From<&PlanError> for PlanErrorResponse {
    fn from(err: &PlanError) -> Self {
        Self { code: err.error_code(), message: err.to_string() }
    }
}

/// Implement From for serde_json::Error
impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Parse(ParseError::InvalidJson(err.to_string()))
    }
}

pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_by_category() {
        assert_eq!(PlanError::from(ParseError::MissingPlan).error_code(), 1002);
        assert_eq!(PlanError::from(ParseError::EmptyDocument).error_code(), 1004);
        assert_eq!(PlanError::unsupported_metric("rows").error_code(), 2001);
        assert_eq!(PlanError::MissingCustomExtractor.error_code(), 2002);
        assert_eq!(PlanError::invalid_config("threshold").error_code(), 2003);
    }

    #[test]
    fn test_serde_json_error_becomes_parse_error() {
        let err: PlanError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, PlanError::Parse(ParseError::InvalidJson(_))));

        let body = PlanErrorResponse::from(&err);
        assert_eq!(body.code, 1001);
        assert!(body.message.starts_with("Malformed plan"));
    }
}
