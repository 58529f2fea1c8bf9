//! Verification keys of the gateway, by fingerprint.
//!
//! Unknown fingerprints are looked up with `GET Key/{fingerprint}`. The
//! response is itself a signed envelope, and is trusted when either:
//!
//! - its signer is already cached (chain of trust), or
//! - its signer is the certificate it describes (trust on first use).
//!
//! Anything else fails with [`ProtocolError::FingerprintNotFound`]. Only one
//! lookup runs at a time per cache; callers that queued behind it re-read the
//! cache before fetching.

use std::collections::HashMap;
use std::sync::Arc;

use paygate_crypto::{SignatureEngine, VerificationKey};
use paygate_wire::{Fingerprint, PublicKeyInfo, RawEnvelope, ServerResponse};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::endpoints::key_path;
use crate::error::{ProtocolError, ProtocolResult};
use crate::transport::Transport;

#[derive(Debug, Default)]
struct KeyCacheInner {
    keys: RwLock<HashMap<Fingerprint, Arc<VerificationKey>>>,
    fetch_gate: Mutex<()>,
}

/// Shared cache of trusted gateway keys.
///
/// Cloning is cheap; clones share the same keys.
#[derive(Debug, Clone, Default)]
pub struct KeyCache {
    inner: Arc<KeyCacheInner>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a key, replacing any key cached under the same fingerprint.
    pub async fn insert(&self, key: VerificationKey) -> Arc<VerificationKey> {
        let key = Arc::new(key);
        self.inner
            .keys
            .write()
            .await
            .insert(key.fingerprint().clone(), Arc::clone(&key));
        key
    }

    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<VerificationKey>> {
        self.inner.keys.read().await.get(fingerprint).cloned()
    }

    pub async fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.keys.read().await.contains_key(fingerprint)
    }

    pub async fn len(&self) -> usize {
        self.inner.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.keys.read().await.is_empty()
    }

    /// Return the key for `fingerprint`, fetching it from the gateway if needed.
    pub async fn resolve(
        &self,
        fingerprint: &Fingerprint,
        transport: &dyn Transport,
        engine: &SignatureEngine,
    ) -> ProtocolResult<Arc<VerificationKey>> {
        if let Some(key) = self.get(fingerprint).await {
            return Ok(key);
        }

        let _gate = self.inner.fetch_gate.lock().await;
        if let Some(key) = self.get(fingerprint).await {
            debug!(fingerprint = %fingerprint, "Key cached while waiting for fetch");
            return Ok(key);
        }

        let key = self.fetch(fingerprint, transport, engine).await?;
        let key = self.insert(key).await;
        info!(fingerprint = %fingerprint, "Trusted new gateway key");
        Ok(key)
    }

    async fn fetch(
        &self,
        fingerprint: &Fingerprint,
        transport: &dyn Transport,
        engine: &SignatureEngine,
    ) -> ProtocolResult<VerificationKey> {
        debug!(fingerprint = %fingerprint, "Fetching gateway key");
        let body = transport.get(&key_path(fingerprint.as_str())).await?;
        let envelope = RawEnvelope::from_slice(&body)?;

        let unverified: ServerResponse<PublicKeyInfo> = envelope.decode_payload()?;
        let info = unverified
            .response
            .ok_or_else(|| ProtocolError::FingerprintInvalid {
                fingerprint: fingerprint.clone(),
                reason: unverified
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "key lookup returned no key".to_string()),
                server_messages: unverified.i18n_error_messages.clone(),
            })?;

        let asserted = VerificationKey::from_public_key_info(&info)?;
        let signer = envelope.fingerprint();

        let verifier = match self.get(signer).await {
            Some(cached) => cached,
            None if signer == &info.fingerprint => Arc::new(asserted.clone()),
            None => {
                warn!(
                    fingerprint = %fingerprint,
                    signer = %signer,
                    "Key lookup signed by an unknown certificate"
                );
                return Err(ProtocolError::FingerprintNotFound {
                    fingerprint: fingerprint.clone(),
                });
            }
        };

        let response: ServerResponse<PublicKeyInfo> = engine.verify_raw(&verifier, &envelope)?;
        if !response.is_ok() {
            return Err(ProtocolError::FingerprintInvalid {
                fingerprint: fingerprint.clone(),
                reason: response
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("gateway returned {}", response.result_code)),
                server_messages: response.i18n_error_messages,
            });
        }

        if asserted.fingerprint() != &info.fingerprint {
            return Err(ProtocolError::FingerprintInvalid {
                fingerprint: fingerprint.clone(),
                reason: format!(
                    "certificate thumbprint {} does not match {}",
                    asserted.fingerprint(),
                    info.fingerprint
                ),
                server_messages: Default::default(),
            });
        }

        if &info.fingerprint != fingerprint {
            warn!(
                fingerprint = %fingerprint,
                returned = %info.fingerprint,
                "Key lookup answered with a different key"
            );
            return Err(ProtocolError::FingerprintInvalid {
                fingerprint: fingerprint.clone(),
                reason: format!("key lookup for {} returned {}", fingerprint, info.fingerprint),
                server_messages: Default::default(),
            });
        }

        Ok(asserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use paygate_crypto::KeyPair;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    fn gateway() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyPair::generate_self_signed("Gateway Signing", 30).unwrap())
    }

    /// Serves one fixed body for every GET.
    struct StaticKeyEndpoint {
        body: Vec<u8>,
        gets: AtomicUsize,
    }

    impl StaticKeyEndpoint {
        fn self_signed(pair: &KeyPair) -> Self {
            let response = ServerResponse::ok(pair.public_key_info().unwrap());
            let envelope = SignatureEngine::default().sign(pair, response).unwrap();
            Self {
                body: envelope.to_json_bytes().unwrap(),
                gets: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for StaticKeyEndpoint {
        async fn post(&self, path: &str, _body: Vec<u8>) -> ProtocolResult<Vec<u8>> {
            Err(ProtocolError::transport(format!("unexpected POST {path}")))
        }

        async fn get(&self, _path: &str) -> ProtocolResult<Vec<u8>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    #[tokio::test]
    async fn test_pinned_key_needs_no_fetch() {
        let cache = KeyCache::new();
        let key = gateway().verification_key().unwrap();
        cache.insert(key).await;

        let endpoint = StaticKeyEndpoint::self_signed(gateway());
        let resolved = cache
            .resolve(gateway().fingerprint(), &endpoint, &SignatureEngine::default())
            .await
            .unwrap();
        assert_eq!(resolved.fingerprint(), gateway().fingerprint());
        assert_eq!(endpoint.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_self_signed_lookup_is_trusted_once() {
        let cache = KeyCache::new();
        let endpoint = StaticKeyEndpoint::self_signed(gateway());
        let engine = SignatureEngine::default();

        cache.resolve(gateway().fingerprint(), &endpoint, &engine).await.unwrap();
        cache.resolve(gateway().fingerprint(), &endpoint, &engine).await.unwrap();

        assert_eq!(endpoint.gets.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_by_lowercase_fingerprint_hits_cache() {
        let cache = KeyCache::new();
        cache.insert(gateway().verification_key().unwrap()).await;
        let lower = Fingerprint::new(gateway().fingerprint().as_str().to_ascii_lowercase());
        assert!(cache.contains(&lower).await);
    }

    #[tokio::test]
    async fn test_clones_share_keys() {
        let cache = KeyCache::new();
        let clone = cache.clone();
        cache.insert(gateway().verification_key().unwrap()).await;
        assert!(!clone.is_empty().await);
    }
}
