//! Clients for every configured identity.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use paygate_crypto::{CertificateResolver, IdentityRegistry, SignatureEngine, SigningIdentity};
use tracing::info;

use crate::config::GatewaySettings;
use crate::driver::{engine_for, GatewayClient};
use crate::error::{ProtocolError, ProtocolResult};
use crate::transport::{HttpTransport, Transport};
use crate::trust::KeyCache;

/// One [`GatewayClient`] per client name, all sharing a transport and a key cache.
#[derive(Clone)]
pub struct ClientFactory {
    clients: HashMap<String, GatewayClient>,
    transport: Arc<dyn Transport>,
    keys: KeyCache,
    engine: SignatureEngine,
}

impl ClientFactory {
    /// Load every configured identity from the platform certificate stores
    /// and connect over HTTP.
    pub fn from_settings(settings: &GatewaySettings) -> ProtocolResult<Self> {
        Self::from_settings_with_resolver(settings, &CertificateResolver::platform_default())
    }

    pub fn from_settings_with_resolver(
        settings: &GatewaySettings,
        resolver: &CertificateResolver,
    ) -> ProtocolResult<Self> {
        settings.validate()?;
        let registry = IdentityRegistry::load(&settings.identity_sources(), resolver)?;
        let transport = HttpTransport::with_timeout(
            &settings.gateway_url,
            Duration::from_secs(settings.timeout_secs),
        )?;
        Ok(Self::with_transport(
            &registry,
            Arc::new(transport),
            engine_for(settings),
        ))
    }

    /// Build clients for `registry` over a caller-supplied transport.
    pub fn with_transport(
        registry: &IdentityRegistry,
        transport: Arc<dyn Transport>,
        engine: SignatureEngine,
    ) -> Self {
        let mut factory = Self {
            clients: HashMap::new(),
            transport,
            keys: KeyCache::new(),
            engine,
        };
        for name in registry.client_names() {
            if let Ok(identity) = registry.get(name) {
                factory.insert_shared(identity);
            }
        }
        info!(clients = factory.clients.len(), "Gateway clients ready");
        factory
    }

    /// Add a client, replacing any client with the same name.
    pub fn insert(&mut self, identity: SigningIdentity) -> Option<GatewayClient> {
        self.insert_shared(Arc::new(identity))
    }

    fn insert_shared(&mut self, identity: Arc<SigningIdentity>) -> Option<GatewayClient> {
        let name = identity.client_name().to_string();
        let client = GatewayClient::new(identity, Arc::clone(&self.transport))
            .with_key_cache(self.keys.clone())
            .with_engine(self.engine);
        self.clients.insert(name, client)
    }

    /// The client registered under `name`.
    pub fn get(&self, name: &str) -> ProtocolResult<GatewayClient> {
        self.clients
            .get(name.trim())
            .cloned()
            .ok_or_else(|| ProtocolError::UnknownClient(name.trim().to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clients.contains_key(name.trim())
    }

    /// Client names in sorted order.
    pub fn client_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Key cache shared by every client.
    pub fn key_cache(&self) -> &KeyCache {
        &self.keys
    }
}

impl std::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("clients", &self.client_names())
            .finish()
    }
}
