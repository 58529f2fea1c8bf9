//! Canonical JSON.
//!
//! Signer and verifier must produce byte-identical input for the RSA signature,
//! so every signed structure goes through [`Canonicalizer`] first:
//!
//! - object members are sorted by ordinal key comparison (UTF-16 code units),
//!   at every nesting level;
//! - object members whose value is `null` are omitted;
//! - arrays keep their order, elements are canonicalized in place;
//! - date-time strings are normalized (see [`crate::date`]);
//! - serialization is compact, with no insignificant whitespace.
//!
//! # Example
//!
//! ```
//! use paygate_wire::Canonicalizer;
//! use serde_json::json;
//!
//! let canonicalizer = Canonicalizer::default();
//! let a = canonicalizer.to_canonical_bytes(&json!({"currency": "UYU", "amount": 100})).unwrap();
//! let b = canonicalizer.to_canonical_bytes(&json!({"amount": 100, "currency": "UYU"})).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a, br#"{"amount":100,"currency":"UYU"}"#);
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

use crate::date::{normalize_date_string, DateNormalization};
use crate::error::WireResult;

/// A JSON value in canonical form.
///
/// Objects are an ordered list of members, so serialization emits them in
/// exactly the order chosen by the canonicalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    /// `null` (only reachable at top level or inside arrays).
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar, emitted exactly as parsed.
    Number(Number),
    /// String scalar (already date-normalized).
    String(String),
    /// Array, order preserved.
    Array(Vec<CanonicalValue>),
    /// Object, members sorted.
    Object(Vec<(String, CanonicalValue)>),
}

impl CanonicalValue {
    /// Serialize to compact UTF-8 JSON bytes.
    pub fn to_bytes(&self) -> WireResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Serialize to a compact JSON string.
    pub fn to_json_string(&self) -> WireResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Member keys, in canonical order, if this is an object.
    pub fn keys(&self) -> Option<Vec<&str>> {
        match self {
            Self::Object(members) => Some(members.iter().map(|(k, _)| k.as_str()).collect()),
            _ => None,
        }
    }

    /// Look up an object member.
    pub fn get(&self, key: &str) -> Option<&CanonicalValue> {
        match self {
            Self::Object(members) => members.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (key, value) in members {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Produces [`CanonicalValue`]s under a fixed date policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Canonicalizer {
    dates: DateNormalization,
}

impl Canonicalizer {
    /// Create a canonicalizer with the given date policy.
    pub fn new(dates: DateNormalization) -> Self {
        Self { dates }
    }

    /// The date policy in effect.
    pub fn date_normalization(&self) -> DateNormalization {
        self.dates
    }

    /// Canonicalize a JSON value tree.
    pub fn canonicalize(&self, value: &Value) -> CanonicalValue {
        match value {
            Value::Null => CanonicalValue::Null,
            Value::Bool(b) => CanonicalValue::Bool(*b),
            Value::Number(n) => CanonicalValue::Number(n.clone()),
            Value::String(s) => CanonicalValue::String(
                normalize_date_string(s, self.dates).unwrap_or_else(|| s.clone()),
            ),
            Value::Array(items) => {
                CanonicalValue::Array(items.iter().map(|item| self.canonicalize(item)).collect())
            }
            Value::Object(map) => {
                let mut members: Vec<(String, CanonicalValue)> = map
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), self.canonicalize(v)))
                    .collect();
                members.sort_by(|(a, _), (b, _)| ordinal_cmp(a, b));
                CanonicalValue::Object(members)
            }
        }
    }

    /// Convert any serializable value to JSON, then canonicalize it.
    pub fn canonicalize_serializable<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> WireResult<CanonicalValue> {
        let json = serde_json::to_value(value)?;
        Ok(self.canonicalize(&json))
    }

    /// Canonical UTF-8 bytes of a serializable value.
    pub fn to_canonical_bytes<T: Serialize + ?Sized>(&self, value: &T) -> WireResult<Vec<u8>> {
        self.canonicalize_serializable(value)?.to_bytes()
    }

    /// Canonical JSON text of a serializable value.
    pub fn to_canonical_string<T: Serialize + ?Sized>(&self, value: &T) -> WireResult<String> {
        self.canonicalize_serializable(value)?.to_json_string()
    }
}

/// Ordinal string comparison over UTF-16 code units.
fn ordinal_cmp(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
