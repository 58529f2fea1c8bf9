//! CLI error types.

use paygate_client::ProtocolError;
use paygate_crypto::CryptoError;
use paygate_wire::{ResultCode, WireError};
use thiserror::Error;

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error enum wrapping all crate errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Client or gateway error.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// Certificate, signing or verification error.
    #[error("{0}")]
    Crypto(#[from] CryptoError),

    /// Envelope encoding error.
    #[error("{0}")]
    Wire(#[from] WireError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Result code equivalent of this error.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::Config(_) => ResultCode::InvalidConfiguration,
            Self::Protocol(e) => e.result_code(),
            Self::Crypto(e) => e.result_code(),
            Self::Wire(_) | Self::Io(_) | Self::Json(_) | Self::FileNotFound(_) => {
                ResultCode::SystemError
            }
        }
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Not found: 2
            Self::FileNotFound(_) => 2,
            // Config errors: 3
            Self::Config(_) => 3,
            // Everything else by result code
            _ => match self.result_code() {
                ResultCode::InvalidConfiguration => 3,
                ResultCode::InvalidSignature => 4,
                ResultCode::Expired => 5,
                ResultCode::InvalidFingerprint => 6,
                _ => 1,
            },
        }
    }

    /// Recovery hint for the user, if there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self.result_code() {
            ResultCode::InvalidConfiguration => {
                Some("Check the configuration file (--config) and the certificate settings.")
            }
            ResultCode::InvalidSignature => {
                Some("The envelope was modified or signed with a different certificate.")
            }
            ResultCode::Expired => Some("Envelopes are only valid for a short time; sign again."),
            ResultCode::InvalidFingerprint => {
                Some("The signer's key is not trusted; check the gateway URL.")
            }
            _ => None,
        }
    }
}
