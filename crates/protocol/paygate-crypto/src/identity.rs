//! Client signing identities.
//!
//! A [`SigningIdentity`] is a client name bound to the key pair it signs with.
//! Identities are resolved once and never change afterwards.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use paygate_wire::{Fingerprint, PublicKeyInfo};
use tracing::info;
use zeroize::Zeroizing;

use crate::certificate::KeyPair;
use crate::error::{CryptoError, CryptoResult};
use crate::resolver::CertificateResolver;

/// Where to find the certificate of one client.
#[derive(Clone)]
pub struct IdentitySource {
    pub client_name: String,
    pub certificate_name: String,
    pub certificate_password: Zeroizing<String>,
    /// Directory holding `{certificate_name}.pfx`, used when no store has it.
    pub certificate_path: Option<PathBuf>,
}

impl IdentitySource {
    pub fn new(client_name: impl Into<String>, certificate_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            certificate_name: certificate_name.into(),
            certificate_password: Zeroizing::new(String::new()),
            certificate_path: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.certificate_password = Zeroizing::new(password.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_path = Some(path.into());
        self
    }
}

impl fmt::Debug for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySource")
            .field("client_name", &self.client_name)
            .field("certificate_name", &self.certificate_name)
            .field("certificate_password", &"[redacted]")
            .field("certificate_path", &self.certificate_path)
            .finish()
    }
}

/// A named client and the key pair it signs with.
#[derive(Debug)]
pub struct SigningIdentity {
    client_name: String,
    key_pair: KeyPair,
}

impl SigningIdentity {
    pub fn new(client_name: impl AsRef<str>, key_pair: KeyPair) -> Self {
        Self {
            client_name: client_name.as_ref().trim().to_string(),
            key_pair,
        }
    }

    /// Resolve the certificate described by `source`.
    pub fn load(source: &IdentitySource, resolver: &CertificateResolver) -> CryptoResult<Self> {
        if source.client_name.trim().is_empty() {
            return Err(CryptoError::configuration(
                "Invalid client line in configuration: missing client name",
                "La línea del cliente en la configuración es inválida: falta el nombre del cliente",
            ));
        }
        let key_pair = resolver.resolve(
            &source.certificate_name,
            &source.certificate_password,
            source.certificate_path.as_deref(),
        )?;
        let identity = Self::new(&source.client_name, key_pair);
        info!(
            client = %identity.client_name,
            fingerprint = %identity.fingerprint(),
            "Signing identity loaded"
        );
        Ok(identity)
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        self.key_pair.fingerprint()
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn public_key_info(&self) -> CryptoResult<PublicKeyInfo> {
        self.key_pair.public_key_info()
    }
}

/// Signing identities keyed by client name.
#[derive(Debug, Default, Clone)]
pub struct IdentityRegistry {
    identities: HashMap<String, Arc<SigningIdentity>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every identity; any failure aborts.
    pub fn load(sources: &[IdentitySource], resolver: &CertificateResolver) -> CryptoResult<Self> {
        if sources.is_empty() {
            return Err(CryptoError::configuration(
                "Invalid client line in configuration",
                "La línea del cliente en la configuración es inválida",
            ));
        }
        let mut registry = Self::new();
        for source in sources {
            registry.insert(SigningIdentity::load(source, resolver)?);
        }
        Ok(registry)
    }

    /// Register an identity, replacing any with the same client name.
    pub fn insert(&mut self, identity: SigningIdentity) -> Option<Arc<SigningIdentity>> {
        self.identities
            .insert(identity.client_name.clone(), Arc::new(identity))
    }

    pub fn get(&self, client_name: &str) -> CryptoResult<Arc<SigningIdentity>> {
        self.identities
            .get(client_name.trim())
            .cloned()
            .ok_or_else(|| CryptoError::UnknownIdentity {
                client: client_name.to_string(),
            })
    }

    pub fn contains(&self, client_name: &str) -> bool {
        self.identities.contains_key(client_name.trim())
    }

    /// Registered client names, sorted.
    pub fn client_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.identities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
