//! Error types for the gateway client.

use paygate_crypto::CryptoError;
use paygate_wire::{
    Fingerprint, Localized, LocalizedMessages, ResultCode, WireError, LANG_EN, LANG_ES,
};
use thiserror::Error;

/// Result type for client operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur talking to the gateway.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// No trust anchor for the key served for a fingerprint.
    #[error("fingerprint not found: {fingerprint}")]
    FingerprintNotFound { fingerprint: Fingerprint },

    /// The gateway rejected the fingerprint, or served a key that does not match it.
    #[error("invalid or outdated fingerprint {fingerprint}: {reason}")]
    FingerprintInvalid {
        fingerprint: Fingerprint,
        reason: String,
        /// Messages returned by the gateway, if any.
        server_messages: LocalizedMessages,
    },

    /// Network failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("gateway returned HTTP {status} for {path}")]
    Http { status: u16, path: String },

    /// The response could not be parsed.
    #[error("decode error: {0}")]
    Decode(#[from] WireError),

    /// Signing, verification or key material failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// No client with this name was configured.
    #[error("the requested client '{0}' was not found")]
    UnknownClient(String),

    /// Invalid settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading the configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing the configuration file failed.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ProtocolError {
    /// Create a new Transport error.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }

    /// Create a new Config error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Result code reported for this error.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::FingerprintNotFound { .. } | Self::FingerprintInvalid { .. } => {
                ResultCode::InvalidFingerprint
            }
            Self::Crypto(e) => e.result_code(),
            Self::UnknownClient(_) | Self::Config(_) | Self::TomlParse(_) => {
                ResultCode::InvalidConfiguration
            }
            Self::Transport(_) | Self::Http { .. } | Self::Decode(_) | Self::Io(_) => {
                ResultCode::SystemError
            }
        }
    }

    /// Returns true if this error is transient and the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ProtocolError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            let path = e.url().map(|u| u.path().to_string()).unwrap_or_default();
            return Self::Http {
                status: status.as_u16(),
                path,
            };
        }
        Self::Transport(e.to_string())
    }
}

impl Localized for ProtocolError {
    fn localized(&self) -> LocalizedMessages {
        match self {
            Self::FingerprintNotFound { fingerprint } => LocalizedMessages::bilingual(
                format!("Fingerprint not found: {fingerprint}"),
                format!("Huella no encontrada: {fingerprint}"),
            ),
            Self::FingerprintInvalid {
                reason,
                server_messages,
                ..
            } => {
                let en = server_messages.get(LANG_EN).unwrap_or(reason);
                let es = server_messages.get(LANG_ES).unwrap_or(en);
                LocalizedMessages::bilingual(
                    format!("Invalid or outdated fingerprint, server returns: {en}"),
                    format!("Huella inválida o vencida, el servidor retorna: {es}"),
                )
            }
            Self::Transport(reason) => LocalizedMessages::bilingual(
                format!("Unable to reach the gateway: {reason}"),
                format!("No se pudo contactar al gateway: {reason}"),
            ),
            Self::Http { status, path } => LocalizedMessages::bilingual(
                format!("The gateway returned HTTP {status} for {path}"),
                format!("El gateway retornó HTTP {status} para {path}"),
            ),
            Self::Decode(e) => LocalizedMessages::bilingual(
                format!("Invalid gateway response: {e}"),
                format!("Respuesta inválida del gateway: {e}"),
            ),
            Self::Crypto(e) => e.localized(),
            Self::UnknownClient(name) => LocalizedMessages::bilingual(
                format!("The requested client '{name}' was not found"),
                format!("El cliente '{name}' solicitado no existe"),
            ),
            Self::Config(reason) => LocalizedMessages::bilingual(
                format!("Invalid configuration: {reason}"),
                format!("Configuración inválida: {reason}"),
            ),
            Self::Io(e) => LocalizedMessages::bilingual(
                format!("Unable to read configuration: {e}"),
                format!("No se pudo leer la configuración: {e}"),
            ),
            Self::TomlParse(e) => LocalizedMessages::bilingual(
                format!("Invalid configuration file: {e}"),
                format!("Archivo de configuración inválido: {e}"),
            ),
        }
    }
}
