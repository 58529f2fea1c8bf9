//! Wire format for the Paygate signed-envelope protocol.
//!
//! This crate holds everything both ends of the protocol must agree on
//! byte-for-byte, without any cryptography:
//!
//! - **Canonical JSON** ([`Canonicalizer`]): deterministic serialization used
//!   as signature input
//! - **Envelopes** ([`SignedEnvelope`], [`StateObject`]): the signed wrapper
//! - **Models** ([`ClientRequest`], [`ServerResponse`], [`ResultCode`], ...)
//! - **Localized messages** ([`LocalizedMessages`]): English/Spanish error texts
//!
//! # Canonical form
//!
//! - Object members sorted by ordinal key comparison, recursively
//! - Null object members omitted
//! - Array order preserved
//! - Date-time strings normalized per [`DateNormalization`]
//! - Compact output, no whitespace
//!
//! # Example
//!
//! ```
//! use paygate_wire::{Canonicalizer, Fingerprint, StateObject};
//! use serde_json::json;
//!
//! let state = StateObject::new(
//!     Fingerprint::new("0AFF"),
//!     1_700_000_600,
//!     json!({"currency": "UYU", "amount": 100}),
//! );
//! let text = Canonicalizer::default().to_canonical_string(&state).unwrap();
//! assert_eq!(
//!     text,
//!     r#"{"Fingerprint":"0AFF","Object":{"amount":100,"currency":"UYU"},"UTCUnixTimeExpiration":1700000600}"#
//! );
//! ```

pub mod canonical;
pub mod date;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod i18n;
pub mod models;

pub use canonical::{CanonicalValue, Canonicalizer};
pub use date::{normalize_date_string, DateNormalization};
pub use envelope::{RawEnvelope, SignedEnvelope, StateObject, DEFAULT_EXPIRATION_SECS};
pub use error::{WireError, WireResult};
pub use fingerprint::Fingerprint;
pub use i18n::{Localized, LocalizedMessages, LANG_EN, LANG_ES};
pub use models::{ClientRequest, ClientResponse, PublicKeyInfo, ResultCode, ServerResponse};
