//! Signed envelope structures.
//!
//! Every message exchanged with the gateway has this shape on the wire:
//!
//! ```text
//! {
//!   "Object": {
//!     "Fingerprint": "<signer thumbprint>",
//!     "UTCUnixTimeExpiration": 1718000000,
//!     "Object": <payload>
//!   },
//!   "Signature": "<base64 RSA signature over the canonical inner Object>"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WireError, WireResult};
use crate::fingerprint::Fingerprint;

/// Validity window of a freshly signed envelope, in seconds.
pub const DEFAULT_EXPIRATION_SECS: i64 = 600;

/// The signed portion of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateObject<T> {
    /// Thumbprint of the signing certificate.
    #[serde(rename = "Fingerprint")]
    pub fingerprint: Fingerprint,
    /// Expiration as Unix seconds (UTC).
    #[serde(rename = "UTCUnixTimeExpiration")]
    pub expiration: i64,
    /// The payload.
    #[serde(rename = "Object")]
    pub payload: T,
}

impl<T> StateObject<T> {
    pub fn new(fingerprint: Fingerprint, expiration: i64, payload: T) -> Self {
        Self {
            fingerprint,
            expiration,
            payload,
        }
    }

    /// Whether the envelope is expired at `now` (Unix seconds).
    ///
    /// The expiration second itself is still valid.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expiration
    }

    /// Expiration as a UTC timestamp, if representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expiration, 0)
    }
}

/// A state object plus its base64 signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedEnvelope<T> {
    #[serde(rename = "Object")]
    pub object: StateObject<T>,
    #[serde(rename = "Signature")]
    pub signature: String,
}

/// An envelope whose payload has not been decoded yet.
///
/// Inbound envelopes are verified in this form so the exact payload the peer
/// signed is what gets canonicalized.
pub type RawEnvelope = SignedEnvelope<Value>;

impl<T> SignedEnvelope<T> {
    pub fn new(object: StateObject<T>, signature: impl Into<String>) -> Self {
        Self {
            object,
            signature: signature.into(),
        }
    }

    /// Fingerprint of the signer.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.object.fingerprint
    }

    /// Expiration in Unix seconds.
    pub fn expiration(&self) -> i64 {
        self.object.expiration
    }

    pub fn payload(&self) -> &T {
        &self.object.payload
    }

    pub fn into_payload(self) -> T {
        self.object.payload
    }
}

impl<T: Serialize> SignedEnvelope<T> {
    /// Encode as JSON for transmission.
    pub fn to_json_bytes(&self) -> WireResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Convert into an undecoded envelope.
    pub fn to_raw(&self) -> WireResult<RawEnvelope> {
        Ok(SignedEnvelope {
            object: StateObject {
                fingerprint: self.object.fingerprint.clone(),
                expiration: self.object.expiration,
                payload: serde_json::to_value(&self.object.payload)?,
            },
            signature: self.signature.clone(),
        })
    }
}

impl RawEnvelope {
    /// Parse an envelope from JSON bytes, leaving the payload undecoded.
    pub fn from_slice(bytes: &[u8]) -> WireResult<Self> {
        let mut value: Value = serde_json::from_slice(bytes)?;
        let outer = value
            .as_object_mut()
            .ok_or_else(|| WireError::malformed("expected a JSON object"))?;
        if !outer.get("Signature").is_some_and(Value::is_string) {
            return Err(WireError::malformed("missing Signature"));
        }
        let inner = outer
            .get_mut("Object")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| WireError::malformed("missing Object"))?;
        if !inner.get("Fingerprint").is_some_and(Value::is_string) {
            return Err(WireError::malformed("missing Fingerprint"));
        }
        if !inner.get("UTCUnixTimeExpiration").is_some_and(Value::is_i64) {
            return Err(WireError::malformed("missing UTCUnixTimeExpiration"));
        }
        // An absent payload canonicalizes the same as null.
        inner.entry("Object").or_insert(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// Decode the payload into a concrete type.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> WireResult<T> {
        Ok(T::deserialize(&self.object.payload)?)
    }

    /// Decode the payload, keeping the envelope around it.
    pub fn into_typed<T: DeserializeOwned>(self) -> WireResult<SignedEnvelope<T>> {
        let payload = T::deserialize(&self.object.payload)?;
        Ok(SignedEnvelope {
            object: StateObject {
                fingerprint: self.object.fingerprint,
                expiration: self.object.expiration,
                payload,
            },
            signature: self.signature,
        })
    }
}
