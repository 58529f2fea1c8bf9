//! Error types for paygate-wire

use thiserror::Error;

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors that can occur while encoding or decoding wire structures.
#[derive(Debug, Error)]
pub enum WireError {
    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope is structurally invalid.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

impl WireError {
    /// Create a new MalformedEnvelope error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = WireError::malformed("missing Object");
        assert_eq!(err.to_string(), "malformed envelope: missing Object");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: WireError = json_err.into();
        assert!(matches!(err, WireError::Json(_)));
    }
}
