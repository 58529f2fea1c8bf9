//! Signed request/response exchange with the gateway.
//!
//! A call wraps the request in a [`ClientRequest`], signs it with the client's
//! identity and posts it. The response envelope is verified against the
//! gateway key named by its fingerprint (see [`KeyCache`]) and decoded into a
//! [`ServerResponse`].
//!
//! Calls never return `Err`: transport, decoding, signature, expiration and
//! fingerprint failures are reported as a `ServerResponse` carrying the
//! matching [`ResultCode`] and localized messages.

use std::sync::Arc;
use std::time::Duration;

use paygate_crypto::{CertificateResolver, SignatureEngine, SigningIdentity, VerificationKey};
use paygate_wire::{
    Canonicalizer, ClientRequest, ClientResponse, Fingerprint, Localized, PublicKeyInfo,
    RawEnvelope, ResultCode, ServerResponse, SignedEnvelope,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::config::GatewaySettings;
use crate::error::{ProtocolError, ProtocolResult};
use crate::transport::{HttpTransport, Transport};
use crate::trust::KeyCache;

/// Client for one configured identity.
///
/// Cloning is cheap; clones share the transport and key cache.
#[derive(Clone)]
pub struct GatewayClient {
    identity: Arc<SigningIdentity>,
    transport: Arc<dyn Transport>,
    keys: KeyCache,
    engine: SignatureEngine,
}

impl GatewayClient {
    pub fn new(identity: Arc<SigningIdentity>, transport: Arc<dyn Transport>) -> Self {
        Self {
            identity,
            transport,
            keys: KeyCache::new(),
            engine: SignatureEngine::default(),
        }
    }

    /// Share `keys` with other clients.
    pub fn with_key_cache(mut self, keys: KeyCache) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_engine(mut self, engine: SignatureEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Build a client for the first configured identity, searching the
    /// platform certificate stores.
    pub fn from_settings(settings: &GatewaySettings) -> ProtocolResult<Self> {
        Self::from_settings_with_resolver(settings, &CertificateResolver::platform_default())
    }

    pub fn from_settings_with_resolver(
        settings: &GatewaySettings,
        resolver: &CertificateResolver,
    ) -> ProtocolResult<Self> {
        settings.validate()?;
        let source = settings
            .identity_sources()
            .into_iter()
            .next()
            .ok_or_else(|| ProtocolError::config("no client is configured"))?;
        let identity = SigningIdentity::load(&source, resolver)?;
        let transport = HttpTransport::with_timeout(
            &settings.gateway_url,
            Duration::from_secs(settings.timeout_secs),
        )?;
        Ok(Self::new(Arc::new(identity), Arc::new(transport))
            .with_engine(engine_for(settings)))
    }

    pub fn client_name(&self) -> &str {
        self.identity.client_name()
    }

    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    pub fn key_cache(&self) -> &KeyCache {
        &self.keys
    }

    pub fn engine(&self) -> &SignatureEngine {
        &self.engine
    }

    /// This client's certificate in the shape the gateway publishes keys.
    pub fn public_key_info(&self) -> ProtocolResult<PublicKeyInfo> {
        Ok(self.identity.public_key_info()?)
    }

    /// POST `request` to `path` and return the verified response.
    pub async fn call<Req, Resp>(&self, path: &str, request: Req) -> ServerResponse<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let body = self.encode(ClientRequest::new(self.client_name(), request));
        self.exchange(path, body).await
    }

    /// POST a request without a body (`{"Client": ...}` only).
    pub async fn call_without_request<Resp>(&self, path: &str) -> ServerResponse<Resp>
    where
        Resp: DeserializeOwned,
    {
        let body = self.encode(ClientRequest::<()>::empty(self.client_name()));
        self.exchange(path, body).await
    }

    /// Verify a callback the gateway pushed to this client.
    ///
    /// The callback envelope carries `T` directly; a verified callback is
    /// returned as a successful response.
    pub async fn unwrap_callback<T>(&self, body: &[u8]) -> ServerResponse<T>
    where
        T: DeserializeOwned,
    {
        match self.open_callback::<T>(body).await {
            Ok(payload) => ServerResponse::ok(payload),
            Err(e) => self.failure("callback", e),
        }
    }

    /// Sign the acknowledgment for a callback's outcome.
    pub fn sign_callback_response<T>(
        &self,
        outcome: &ServerResponse<T>,
    ) -> ProtocolResult<SignedEnvelope<ClientResponse>> {
        let ack = ClientResponse {
            client: self.client_name().to_string(),
            result_code: outcome.result_code,
            error_message: outcome.error_message.clone(),
        };
        Ok(self.engine.sign(self.identity.key_pair(), ack)?)
    }

    /// Resolve the gateway key for `fingerprint`, fetching it if not cached.
    pub async fn fetch_key(&self, fingerprint: &Fingerprint) -> ProtocolResult<Arc<VerificationKey>> {
        self.keys
            .resolve(fingerprint, self.transport.as_ref(), &self.engine)
            .await
    }

    fn encode<Req: Serialize>(&self, request: ClientRequest<Req>) -> ProtocolResult<Vec<u8>> {
        let envelope = self.engine.sign(self.identity.key_pair(), request)?;
        Ok(envelope.to_json_bytes()?)
    }

    async fn exchange<Resp>(&self, path: &str, body: ProtocolResult<Vec<u8>>) -> ServerResponse<Resp>
    where
        Resp: DeserializeOwned,
    {
        match self.try_exchange(path, body).await {
            Ok(response) => {
                debug!(
                    path = path,
                    client = self.client_name(),
                    code = %response.result_code,
                    "Gateway call completed"
                );
                response
            }
            Err(e) => self.failure(path, e),
        }
    }

    async fn try_exchange<Resp>(
        &self,
        path: &str,
        body: ProtocolResult<Vec<u8>>,
    ) -> ProtocolResult<ServerResponse<Resp>>
    where
        Resp: DeserializeOwned,
    {
        let response = self.transport.post(path, body?).await?;
        let envelope = RawEnvelope::from_slice(&response)?;
        self.open(&envelope).await
    }

    async fn open_callback<T: DeserializeOwned>(&self, body: &[u8]) -> ProtocolResult<T> {
        let envelope = RawEnvelope::from_slice(body)?;
        self.open(&envelope).await
    }

    async fn open<T: DeserializeOwned>(&self, envelope: &RawEnvelope) -> ProtocolResult<T> {
        let key = self.fetch_key(envelope.fingerprint()).await?;
        Ok(self.engine.verify_raw(&key, envelope)?)
    }

    fn failure<T>(&self, path: &str, err: ProtocolError) -> ServerResponse<T> {
        let code: ResultCode = err.result_code();
        error!(
            path = path,
            client = self.client_name(),
            code = %code,
            error = %err,
            "Gateway call failed"
        );
        ServerResponse::failure(code, err.localized())
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("client", &self.client_name())
            .field("fingerprint", self.identity.fingerprint())
            .finish()
    }
}

/// Signature engine honoring the configured date normalization.
pub(crate) fn engine_for(settings: &GatewaySettings) -> SignatureEngine {
    SignatureEngine::new(Canonicalizer::new(settings.date_normalization))
}
