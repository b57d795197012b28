use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationError {
    /// Caller-correctable: an assumption or financial fact lies outside the
    /// domain the model is defined on.
    #[error("Invalid assumption: {field} — {reason}")]
    InvalidAssumption { field: String, reason: String },

    /// Upstream data gap: a required financial fact was not supplied.
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ValuationError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValuationError::InvalidAssumption {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Arithmetic driven by `field` left the representable decimal range.
    pub(crate) fn overflow(field: &str) -> Self {
        Self::invalid(field, "Too extreme: result exceeds the decimal range")
    }
}

impl From<serde_json::Error> for ValuationError {
    fn from(e: serde_json::Error) -> Self {
        ValuationError::Serialization(e.to_string())
    }
}
