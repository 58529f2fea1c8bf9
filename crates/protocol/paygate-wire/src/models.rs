//! Payload models shared by every endpoint.
//!
//! Field names follow the gateway's PascalCase JSON.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::fingerprint::Fingerprint;
use crate::i18n::{LocalizedMessages, LANG_EN};

/// Outcome code carried by every server response.
///
/// Travels as an integer. Unrecognized values are preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    InvalidFingerprint,
    InvalidSignature,
    Expired,
    InvalidConfiguration,
    SystemError,
    Other(i32),
}

impl ResultCode {
    /// Integer value on the wire.
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::InvalidFingerprint => 1,
            Self::InvalidSignature => 2,
            Self::Expired => 3,
            Self::InvalidConfiguration => 4,
            Self::SystemError => 99,
            Self::Other(n) => n,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::InvalidFingerprint,
            2 => Self::InvalidSignature,
            3 => Self::Expired,
            4 => Self::InvalidConfiguration,
            99 => Self::SystemError,
            n => Self::Other(n),
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("Ok"),
            Self::InvalidFingerprint => f.write_str("InvalidFingerprint"),
            Self::InvalidSignature => f.write_str("InvalidSignature"),
            Self::Expired => f.write_str("Expired"),
            Self::InvalidConfiguration => f.write_str("InvalidConfiguration"),
            Self::SystemError => f.write_str("SystemError"),
            Self::Other(n) => write!(f, "Other({n})"),
        }
    }
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl Serialize for ResultCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for ResultCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Self::from_code)
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Request body sent to every business endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest<T> {
    /// Name of the calling client.
    #[serde(rename = "Client")]
    pub client: String,
    /// Endpoint-specific request, absent for parameterless calls.
    #[serde(rename = "Request", skip_serializing_if = "Option::is_none")]
    pub request: Option<T>,
}

impl<T> ClientRequest<T> {
    pub fn new(client: impl Into<String>, request: T) -> Self {
        Self {
            client: client.into(),
            request: Some(request),
        }
    }

    /// A request without a body.
    pub fn empty(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            request: None,
        }
    }
}

/// Uniform result of every gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse<T> {
    #[serde(rename = "ResultCode")]
    pub result_code: ResultCode,
    /// English error text, when the call failed.
    #[serde(rename = "ErrorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(
        rename = "I18NErrorMessages",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "LocalizedMessages::is_empty"
    )]
    pub i18n_error_messages: LocalizedMessages,
    #[serde(rename = "Response", skip_serializing_if = "Option::is_none")]
    pub response: Option<T>,
}

impl<T> ServerResponse<T> {
    /// A successful response.
    pub fn ok(response: T) -> Self {
        Self {
            result_code: ResultCode::Ok,
            error_message: None,
            i18n_error_messages: LocalizedMessages::new(),
            response: Some(response),
        }
    }

    /// A failed response; the English message becomes `ErrorMessage`.
    pub fn failure(result_code: ResultCode, messages: LocalizedMessages) -> Self {
        Self {
            result_code,
            error_message: messages.get(LANG_EN).map(str::to_owned),
            i18n_error_messages: messages,
            response: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result_code.is_ok()
    }

    /// Error text in the requested language, falling back to English.
    pub fn message(&self, lang: &str) -> Option<&str> {
        self.i18n_error_messages
            .get_or_english(lang)
            .or(self.error_message.as_deref())
    }

    /// Transform the response payload, keeping code and messages.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServerResponse<U> {
        ServerResponse {
            result_code: self.result_code,
            error_message: self.error_message,
            i18n_error_messages: self.i18n_error_messages,
            response: self.response.map(f),
        }
    }
}

/// Acknowledgment a client returns for a gateway callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientResponse {
    #[serde(rename = "Client")]
    pub client: String,
    #[serde(rename = "ResultCode")]
    pub result_code: ResultCode,
    #[serde(rename = "ErrorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A certificate as published by the key endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    #[serde(rename = "Fingerprint")]
    pub fingerprint: Fingerprint,
    /// Base64 DER certificate.
    #[serde(rename = "Key")]
    pub key: String,
}
