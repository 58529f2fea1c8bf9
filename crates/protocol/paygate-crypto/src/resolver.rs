//! Signing certificate lookup.
//!
//! Certificates are searched by name across the configured stores. When no
//! store has one, `{path}/{name}.pfx` is loaded with the configured password.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::certificate::KeyPair;
use crate::error::{CryptoError, CryptoResult};
use crate::store::{CertificateStore, StoreEntry, StoreRoots};

/// Finds signing key pairs by certificate name.
pub struct CertificateResolver {
    stores: Vec<Box<dyn CertificateStore>>,
}

impl CertificateResolver {
    pub fn new(stores: Vec<Box<dyn CertificateStore>>) -> Self {
        Self { stores }
    }

    /// Resolver over the platform store set under `roots`.
    pub fn with_roots(roots: &StoreRoots) -> Self {
        Self::new(
            roots
                .platform_stores()
                .into_iter()
                .map(|store| Box::new(store) as Box<dyn CertificateStore>)
                .collect(),
        )
    }

    /// Resolver over the platform default stores.
    pub fn platform_default() -> Self {
        Self::with_roots(&StoreRoots::platform_default())
    }

    /// Resolver that only uses the PKCS#12 file fallback.
    pub fn without_stores() -> Self {
        Self::new(Vec::new())
    }

    /// Append a store to the scan order.
    pub fn push_store(&mut self, store: impl CertificateStore + 'static) {
        self.stores.push(Box::new(store));
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Scan the stores for a certificate with a private key matching `name`.
    ///
    /// When several certificates match, the last one in scan order is used.
    pub fn find_in_stores(&self, name: &str) -> CryptoResult<Option<KeyPair>> {
        let mut found: Option<StoreEntry> = None;

        for store in &self.stores {
            let entries = match store.entries() {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(store = %store.describe(), error = %e, "Failed to read certificate store");
                    continue;
                }
            };

            for entry in entries {
                if !entry.certificate.matches_name(name) {
                    continue;
                }
                if !entry.has_private_key() {
                    debug!(
                        store = %store.describe(),
                        fingerprint = %entry.certificate.fingerprint(),
                        "Skipping matching certificate without private key"
                    );
                    continue;
                }
                debug!(
                    store = %store.describe(),
                    fingerprint = %entry.certificate.fingerprint(),
                    "Certificate matched"
                );
                found = Some(entry);
            }
        }

        found.and_then(StoreEntry::into_key_pair).transpose()
    }

    /// Resolve the key pair for certificate `name`.
    ///
    /// Stores are searched first; otherwise `{fallback_path}/{name}.pfx` is
    /// decrypted with `password`.
    pub fn resolve(
        &self,
        name: &str,
        password: &str,
        fallback_path: Option<&Path>,
    ) -> CryptoResult<KeyPair> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CryptoError::configuration(
                "A certificate name must be configured",
                "Se debe configurar un nombre de certificado",
            ));
        }

        if let Some(pair) = self.find_in_stores(name)? {
            info!(certificate = name, fingerprint = %pair.fingerprint(), "Loaded certificate from store");
            return Ok(pair);
        }

        let dir = match fallback_path {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => {
                return Err(CryptoError::configuration(
                    "A path must be set if the certificate is not installed on the system",
                    "Se debe establecer una ruta si el certificado no está instalado en el sistema",
                ))
            }
        };

        let file = dir.join(format!("{name}.pfx"));
        let bytes = match std::fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CryptoError::CertificateNotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let pair = KeyPair::from_pkcs12(&bytes, password)?;
        info!(
            certificate = name,
            file = %file.display(),
            fingerprint = %pair.fingerprint(),
            "Loaded certificate from file"
        );
        Ok(pair)
    }
}

impl Default for CertificateResolver {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl std::fmt::Debug for CertificateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stores: Vec<String> = self.stores.iter().map(|s| s.describe()).collect();
        f.debug_struct("CertificateResolver")
            .field("stores", &stores)
            .finish()
    }
}
