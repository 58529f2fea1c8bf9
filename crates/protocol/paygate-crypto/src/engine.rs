//! Envelope signing and verification.
//!
//! The signature input is the canonical JSON of the whole [`StateObject`]
//! (fingerprint, expiration and payload), signed with RSA PKCS#1 v1.5 over
//! SHA-512 and base64 encoded.
//!
//! # Example
//!
//! ```no_run
//! use paygate_crypto::{KeyPair, SignatureEngine};
//! use serde_json::json;
//!
//! let pair = KeyPair::generate_self_signed("Acme", 30).unwrap();
//! let engine = SignatureEngine::default();
//!
//! let envelope = engine.sign(&pair, json!({"amount": 100, "currency": "UYU"})).unwrap();
//! let key = pair.verification_key().unwrap();
//! let payload = engine.verify(&key, &envelope).unwrap();
//! assert_eq!(payload["amount"], 100);
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKeyRef, Private, Public};
use openssl::rsa::Padding;
use openssl::sign::{Signer, Verifier};
use paygate_wire::{
    Canonicalizer, RawEnvelope, SignedEnvelope, StateObject, DEFAULT_EXPIRATION_SECS,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::certificate::{KeyPair, VerificationKey};
use crate::error::{CryptoError, CryptoResult};

/// Signs and verifies envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureEngine {
    canonicalizer: Canonicalizer,
    validity_secs: i64,
}

impl Default for SignatureEngine {
    fn default() -> Self {
        Self::new(Canonicalizer::default())
    }
}

impl SignatureEngine {
    pub fn new(canonicalizer: Canonicalizer) -> Self {
        Self {
            canonicalizer,
            validity_secs: DEFAULT_EXPIRATION_SECS,
        }
    }

    /// Override how long signed envelopes stay valid.
    pub fn with_validity(mut self, secs: i64) -> Self {
        self.validity_secs = secs;
        self
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    pub fn validity_secs(&self) -> i64 {
        self.validity_secs
    }

    /// Sign `payload`, valid from now.
    pub fn sign<T: Serialize>(&self, key_pair: &KeyPair, payload: T) -> CryptoResult<SignedEnvelope<T>> {
        self.sign_at(key_pair, payload, Utc::now().timestamp())
    }

    /// Sign `payload` as if the current time were `now` (Unix seconds).
    pub fn sign_at<T: Serialize>(
        &self,
        key_pair: &KeyPair,
        payload: T,
        now: i64,
    ) -> CryptoResult<SignedEnvelope<T>> {
        let object = StateObject::new(
            key_pair.fingerprint().clone(),
            now + self.validity_secs,
            payload,
        );
        let canonical = self.canonicalizer.to_canonical_bytes(&object)?;
        let signature = sign_bytes(key_pair.private_key(), &canonical)?;
        Ok(SignedEnvelope::new(object, BASE64.encode(signature)))
    }

    /// Verify an envelope and return its payload.
    pub fn verify<'a, T: Serialize>(
        &self,
        key: &VerificationKey,
        envelope: &'a SignedEnvelope<T>,
    ) -> CryptoResult<&'a T> {
        self.verify_at(key, envelope, Utc::now().timestamp())
    }

    /// Verify an envelope as if the current time were `now` (Unix seconds).
    ///
    /// The signature is checked before the expiration.
    pub fn verify_at<'a, T: Serialize>(
        &self,
        key: &VerificationKey,
        envelope: &'a SignedEnvelope<T>,
        now: i64,
    ) -> CryptoResult<&'a T> {
        let canonical = self.canonicalizer.to_canonical_string(&envelope.object)?;

        let valid = match BASE64.decode(envelope.signature.trim()) {
            Ok(signature) => verify_bytes(key.public_key(), canonical.as_bytes(), &signature),
            Err(_) => false,
        };
        if !valid {
            let received = serde_json::to_string(&envelope.object).unwrap_or_default();
            trace!(
                signer = %envelope.fingerprint(),
                received = %received,
                canonical = %canonical,
                "Signature mismatch"
            );
            return Err(CryptoError::SignatureMismatch {
                received,
                canonical,
            });
        }

        if envelope.object.is_expired_at(now) {
            return Err(CryptoError::Expired {
                expiration: envelope.expiration(),
                now,
            });
        }

        Ok(envelope.payload())
    }

    /// Verify an undecoded envelope, then decode its payload.
    pub fn verify_raw<T: DeserializeOwned>(
        &self,
        key: &VerificationKey,
        envelope: &RawEnvelope,
    ) -> CryptoResult<T> {
        self.verify_raw_at(key, envelope, Utc::now().timestamp())
    }

    pub(crate) fn verify_raw_at<T: DeserializeOwned>(
        &self,
        key: &VerificationKey,
        envelope: &RawEnvelope,
        now: i64,
    ) -> CryptoResult<T> {
        self.verify_at(key, envelope, now)?;
        Ok(envelope.decode_payload()?)
    }
}

fn sign_bytes(key: &PKeyRef<Private>, data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut signer = Signer::new(MessageDigest::sha512(), key)?;
    signer.set_rsa_padding(Padding::PKCS1)?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}

/// Any OpenSSL failure counts as a non-matching signature.
fn verify_bytes(key: &PKeyRef<Public>, data: &[u8], signature: &[u8]) -> bool {
    let verify = || -> Result<bool, openssl::error::ErrorStack> {
        let mut verifier = Verifier::new(MessageDigest::sha512(), key)?;
        verifier.set_rsa_padding(Padding::PKCS1)?;
        verifier.update(data)?;
        verifier.verify(signature)
    };
    verify().unwrap_or(false)
}
