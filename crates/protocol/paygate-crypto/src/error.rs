//! Error types for paygate-crypto

use paygate_wire::{Localized, LocalizedMessages, ResultCode, WireError};
use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised while loading key material, signing or verifying.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Missing or invalid identity configuration.
    #[error("{en}")]
    Configuration { en: String, es: String },

    /// No usable certificate with the given name.
    #[error("unable to find certificate '{name}' in the certificate stores")]
    CertificateNotFound { name: String },

    /// No signing identity registered for the client.
    #[error("unable to find certificate for client '{client}'")]
    UnknownIdentity { client: String },

    /// Key material is unusable (wrong algorithm, key does not match certificate, ...).
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Signature did not verify over the canonical payload.
    ///
    /// The texts are the payload as received and as canonicalized locally.
    /// They may contain business data and are not part of the message.
    #[error("signature does not match")]
    SignatureMismatch { received: String, canonical: String },

    /// The envelope is past its expiration.
    #[error("object has expired (expiration {expiration}, now {now})")]
    Expired { expiration: i64, now: i64 },

    /// OpenSSL failure.
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    /// Reading key material failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding the envelope failed.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

impl CryptoError {
    /// Create a configuration error with English and Spanish texts.
    pub fn configuration(en: impl Into<String>, es: impl Into<String>) -> Self {
        Self::Configuration {
            en: en.into(),
            es: es.into(),
        }
    }

    /// Create a new InvalidKey error.
    pub fn invalid_key(reason: impl Into<String>) -> Self {
        Self::InvalidKey(reason.into())
    }

    /// Result code reported to callers for this error.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::Configuration { .. }
            | Self::CertificateNotFound { .. }
            | Self::UnknownIdentity { .. }
            | Self::InvalidKey(_) => ResultCode::InvalidConfiguration,
            Self::SignatureMismatch { .. } => ResultCode::InvalidSignature,
            Self::Expired { .. } => ResultCode::Expired,
            Self::OpenSsl(_) | Self::Io(_) | Self::Wire(_) => ResultCode::SystemError,
        }
    }
}

impl Localized for CryptoError {
    fn localized(&self) -> LocalizedMessages {
        match self {
            Self::Configuration { en, es } => LocalizedMessages::bilingual(en.clone(), es.clone()),
            Self::CertificateNotFound { name } => LocalizedMessages::bilingual(
                format!(
                    "Unable to find certificate '{name}' in the certificate stores; make sure it is installed and readable by the current user"
                ),
                format!(
                    "No se encontró el certificado '{name}' en los almacenes de certificados; asegúrese de que esté instalado y que el usuario actual tenga acceso"
                ),
            ),
            Self::UnknownIdentity { client } => LocalizedMessages::bilingual(
                format!("Unable to find certificate for client '{client}'"),
                format!("No se encontró certificado para el cliente '{client}'"),
            ),
            Self::InvalidKey(reason) => LocalizedMessages::bilingual(
                format!("Invalid key material: {reason}"),
                format!("Material de clave inválido: {reason}"),
            ),
            Self::SignatureMismatch { .. } => {
                LocalizedMessages::bilingual("Signature does not match", "La firma no concuerda")
            }
            Self::Expired { .. } => {
                LocalizedMessages::bilingual("Object has expired", "El objeto ha expirado")
            }
            Self::OpenSsl(e) => LocalizedMessages::bilingual(
                format!("Cryptographic failure: {e}"),
                format!("Falla criptográfica: {e}"),
            ),
            Self::Io(e) => LocalizedMessages::bilingual(
                format!("Unable to read key material: {e}"),
                format!("No se pudo leer el material de clave: {e}"),
            ),
            Self::Wire(e) => LocalizedMessages::bilingual(
                format!("Invalid message: {e}"),
                format!("Mensaje inválido: {e}"),
            ),
        }
    }
}
