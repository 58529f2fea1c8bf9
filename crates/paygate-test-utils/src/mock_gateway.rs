//! In-memory gateway implementing the `Transport` trait.
//!
//! Signs canned responses with a gateway key, serves key lookups and records
//! every request it receives.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use paygate_client::endpoints::KEY;
use paygate_client::{ProtocolError, ProtocolResult, Transport};
use paygate_crypto::{KeyPair, SignatureEngine};
use paygate_wire::{
    Fingerprint, LocalizedMessages, PublicKeyInfo, RawEnvelope, ResultCode, ServerResponse,
};
use serde::Serialize;
use serde_json::Value;

use crate::fixtures::gateway_key_pair;

/// A request seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Parse the body as a signed envelope.
    pub fn envelope(&self) -> RawEnvelope {
        RawEnvelope::from_slice(&self.body).expect("request body is an envelope")
    }
}

/// A key lookup answer: who signs it and what it says.
#[derive(Clone)]
struct KeyRoute {
    signer: KeyPair,
    response: ServerResponse<PublicKeyInfo>,
}

struct MockGatewayInner {
    /// Key used to sign business responses.
    server: KeyPair,
    engine: SignatureEngine,
    /// path -> ServerResponse as JSON.
    routes: HashMap<String, Value>,
    /// fingerprint -> key lookup answer.
    keys: HashMap<Fingerprint, KeyRoute>,
    requests: Vec<RecordedRequest>,
    key_fetches: usize,
    posts: usize,
    /// Applied to key lookups only.
    key_delay: Option<Duration>,
    /// When true, every call fails with a transport error.
    transport_failure: bool,
    /// Seconds added to the clock used for signing.
    clock_offset: i64,
    /// When true, signatures are corrupted after signing.
    tamper: bool,
}

/// A mock gateway for testing.
///
/// Uses `Arc<RwLock<...>>` internally, so it is cheap to clone and all clones
/// share the same state. The lock is never held across an await.
#[derive(Clone)]
pub struct MockGateway {
    inner: Arc<RwLock<MockGatewayInner>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new(gateway_key_pair().clone())
    }
}

impl MockGateway {
    /// A gateway signing with `server` that publishes its own key, self-signed.
    pub fn new(server: KeyPair) -> Self {
        let mock = Self {
            inner: Arc::new(RwLock::new(MockGatewayInner {
                server: server.clone(),
                engine: SignatureEngine::default(),
                routes: HashMap::new(),
                keys: HashMap::new(),
                requests: Vec::new(),
                key_fetches: 0,
                posts: 0,
                key_delay: None,
                transport_failure: false,
                clock_offset: 0,
                tamper: false,
            })),
        };
        mock.serve_key(&server, &server)
    }

    /// Answer POSTs to `path` with `response`.
    pub fn with_response<T: Serialize>(self, path: &str, response: ServerResponse<T>) -> Self {
        let value = serde_json::to_value(response).expect("serialize response");
        self.inner.write().unwrap().routes.insert(path.to_string(), value);
        self
    }

    /// Answer POSTs to `path` with a successful response carrying `payload`.
    pub fn with_ok<T: Serialize>(self, path: &str, payload: T) -> Self {
        self.with_response(path, ServerResponse::ok(payload))
    }

    /// Publish `subject`'s key, with the lookup signed by `signer`.
    pub fn serve_key(self, signer: &KeyPair, subject: &KeyPair) -> Self {
        let info = subject.public_key_info().expect("public key info");
        self.serve_key_info(signer, info)
    }

    /// Publish arbitrary key info under its asserted fingerprint.
    pub fn serve_key_info(self, signer: &KeyPair, info: PublicKeyInfo) -> Self {
        let route = KeyRoute {
            signer: signer.clone(),
            response: ServerResponse::ok(info.clone()),
        };
        self.inner.write().unwrap().keys.insert(info.fingerprint, route);
        self
    }

    /// Answer lookups of `requested` with `subject`'s key, signed by `signer`.
    pub fn serve_key_at(self, requested: &Fingerprint, signer: &KeyPair, subject: &KeyPair) -> Self {
        let info = subject.public_key_info().expect("public key info");
        let route = KeyRoute {
            signer: signer.clone(),
            response: ServerResponse::ok(info),
        };
        self.inner
            .write()
            .unwrap()
            .keys
            .insert(requested.clone(), route);
        self
    }

    /// Reject lookups of `fingerprint` with `code`, signed by `signer`.
    pub fn serve_key_failure(
        self,
        fingerprint: &Fingerprint,
        signer: &KeyPair,
        code: ResultCode,
        messages: LocalizedMessages,
    ) -> Self {
        let route = KeyRoute {
            signer: signer.clone(),
            response: ServerResponse::failure(code, messages),
        };
        self.inner
            .write()
            .unwrap()
            .keys
            .insert(fingerprint.clone(), route);
        self
    }

    /// Reject lookups of `fingerprint` with a non-Ok code, but still include
    /// the key in the response.
    pub fn serve_key_with_code(
        self,
        signer: &KeyPair,
        subject: &KeyPair,
        code: ResultCode,
        messages: LocalizedMessages,
    ) -> Self {
        let info = subject.public_key_info().expect("public key info");
        let mut response = ServerResponse::failure(code, messages);
        response.response = Some(info.clone());
        let route = KeyRoute {
            signer: signer.clone(),
            response,
        };
        self.inner.write().unwrap().keys.insert(info.fingerprint, route);
        self
    }

    /// Stop publishing any key for `fingerprint`.
    pub fn without_key(self, fingerprint: &Fingerprint) -> Self {
        self.inner.write().unwrap().keys.remove(fingerprint);
        self
    }

    /// Delay every key lookup.
    pub fn with_key_delay(self, delay: Duration) -> Self {
        self.inner.write().unwrap().key_delay = Some(delay);
        self
    }

    /// Configure the mock to fail all calls at the transport level.
    pub fn with_transport_failure(self) -> Self {
        self.set_transport_failure(true);
        self
    }

    /// Set the failure mode at runtime.
    pub fn set_transport_failure(&self, fail: bool) {
        self.inner.write().unwrap().transport_failure = fail;
    }

    /// Sign as if the clock were `secs` ahead (negative: behind).
    pub fn with_clock_offset(self, secs: i64) -> Self {
        self.inner.write().unwrap().clock_offset = secs;
        self
    }

    /// Corrupt every signature the mock produces.
    pub fn with_tampered_signatures(self) -> Self {
        self.inner.write().unwrap().tamper = true;
        self
    }

    /// Sign with `server` from now on; previously published keys stay.
    pub fn set_server_key(&self, server: KeyPair) {
        self.inner.write().unwrap().server = server;
    }

    /// The key signing business responses.
    pub fn server_key(&self) -> KeyPair {
        self.inner.read().unwrap().server.clone()
    }

    /// Sign `payload` with the server key, as a gateway callback body.
    pub fn sign_callback<T: Serialize>(&self, payload: T) -> Vec<u8> {
        let inner = self.inner.read().unwrap();
        let server = inner.server.clone();
        Self::seal(&inner, &server, payload)
    }

    fn seal<T: Serialize>(inner: &MockGatewayInner, signer: &KeyPair, payload: T) -> Vec<u8> {
        let now = Utc::now().timestamp() + inner.clock_offset;
        let mut envelope = inner
            .engine
            .sign_at(signer, payload, now)
            .expect("sign mock response");
        if inner.tamper {
            let replacement = if envelope.signature.starts_with('A') { "B" } else { "A" };
            envelope.signature.replace_range(..1, replacement);
        }
        envelope.to_json_bytes().expect("encode envelope")
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// All requests received, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.read().unwrap().requests.clone()
    }

    /// The most recent POST, skipping key lookups made along the way.
    pub fn last_post(&self) -> Option<RecordedRequest> {
        self.inner
            .read()
            .unwrap()
            .requests
            .iter()
            .rev()
            .find(|r| r.method == "POST")
            .cloned()
    }

    /// Number of `GET Key/...` requests.
    pub fn key_fetch_count(&self) -> usize {
        self.inner.read().unwrap().key_fetches
    }

    /// Number of POST requests.
    pub fn post_count(&self) -> usize {
        self.inner.read().unwrap().posts
    }
}

#[async_trait]
impl Transport for MockGateway {
    async fn post(&self, path: &str, body: Vec<u8>) -> ProtocolResult<Vec<u8>> {
        let mut inner = self.inner.write().unwrap();
        inner.posts += 1;
        inner.requests.push(RecordedRequest {
            method: "POST",
            path: path.to_string(),
            body,
        });
        if inner.transport_failure {
            return Err(ProtocolError::transport("connection refused"));
        }

        let response = inner.routes.get(path).cloned().unwrap_or_else(|| {
            let messages = LocalizedMessages::bilingual(
                format!("No route for {path}"),
                format!("No existe la ruta {path}"),
            );
            serde_json::to_value(ServerResponse::<Value>::failure(ResultCode::SystemError, messages))
                .expect("serialize failure")
        });
        let server = inner.server.clone();
        Ok(Self::seal(&inner, &server, response))
    }

    async fn get(&self, path: &str) -> ProtocolResult<Vec<u8>> {
        let delay = {
            let mut inner = self.inner.write().unwrap();
            inner.requests.push(RecordedRequest {
                method: "GET",
                path: path.to_string(),
                body: Vec::new(),
            });
            if inner.transport_failure {
                return Err(ProtocolError::transport("connection refused"));
            }
            let is_key_lookup = path
                .strip_prefix(KEY)
                .is_some_and(|rest| rest.starts_with('/'));
            if is_key_lookup {
                inner.key_fetches += 1;
                inner.key_delay
            } else {
                None
            }
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.read().unwrap();
        let fingerprint = match path.strip_prefix(KEY).and_then(|rest| rest.strip_prefix('/')) {
            Some(fp) => Fingerprint::new(fp),
            None => {
                return Err(ProtocolError::Http {
                    status: 404,
                    path: path.to_string(),
                })
            }
        };

        match inner.keys.get(&fingerprint) {
            Some(route) => Ok(Self::seal(&inner, &route.signer, route.response.clone())),
            None => {
                let messages = LocalizedMessages::bilingual(
                    format!("Unknown fingerprint {fingerprint}"),
                    format!("Huella desconocida {fingerprint}"),
                );
                let response =
                    ServerResponse::<PublicKeyInfo>::failure(ResultCode::InvalidFingerprint, messages);
                let server = inner.server.clone();
                Ok(Self::seal(&inner, &server, response))
            }
        }
    }
}
