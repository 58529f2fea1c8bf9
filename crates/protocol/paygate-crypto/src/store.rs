//! Certificate stores.
//!
//! A store is a directory of certificate files. Stores are addressed the way
//! operating system certificate stores are: a [`StoreLocation`] (whose
//! certificates) and a [`StoreName`] (which collection).
//!
//! ```text
//! <current-user root>/my/acme.pfx
//! <current-user root>/root/gateway.crt
//! <local-machine root>/my/acme.pem
//! ```
//!
//! Recognized files, read in file-name order:
//!
//! | Extension              | Content                                   |
//! |------------------------|-------------------------------------------|
//! | `.pem`                 | certificates, optionally a private key    |
//! | `.crt`, `.cer`, `.der` | one certificate (DER or PEM)              |
//! | `.pfx`, `.p12`         | PKCS#12 archive without a password        |

use std::fmt;
use std::path::{Path, PathBuf};

use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use tracing::{debug, warn};

use crate::certificate::{Certificate, KeyPair};
use crate::error::CryptoResult;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PAYGATE_DATA_DIR";

/// Environment variable overriding the machine-wide store root.
pub const MACHINE_STORE_ENV: &str = "PAYGATE_MACHINE_CERT_DIR";

/// Get the default data directory.
///
/// Uses `PAYGATE_DATA_DIR` when set, otherwise the platform data directory.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("io", "paygate", "paygate")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".paygate")
        })
}

/// Whose certificates a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreLocation {
    CurrentUser,
    LocalMachine,
}

/// Which collection within a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreName {
    /// Personal certificates, usually with private keys.
    My,
    /// Trusted roots.
    Root,
}

impl StoreName {
    fn dir_name(self) -> &'static str {
        match self {
            Self::My => "my",
            Self::Root => "root",
        }
    }
}

/// The stores scanned by default on this platform, in scan order.
pub fn platform_store_set() -> Vec<(StoreLocation, StoreName)> {
    if cfg!(windows) {
        vec![
            (StoreLocation::CurrentUser, StoreName::My),
            (StoreLocation::LocalMachine, StoreName::My),
        ]
    } else {
        vec![
            (StoreLocation::CurrentUser, StoreName::My),
            (StoreLocation::CurrentUser, StoreName::Root),
        ]
    }
}

/// Root directories for each store location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRoots {
    pub current_user: PathBuf,
    pub local_machine: PathBuf,
}

impl StoreRoots {
    /// Platform defaults: the data directory for the current user, a
    /// system-wide directory for the machine.
    pub fn platform_default() -> Self {
        Self {
            current_user: default_data_dir().join("certs"),
            local_machine: default_machine_root(),
        }
    }

    /// Both locations under one base directory.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            current_user: base.join("current-user"),
            local_machine: base.join("local-machine"),
        }
    }

    pub fn path_for(&self, location: StoreLocation, name: StoreName) -> PathBuf {
        let root = match location {
            StoreLocation::CurrentUser => &self.current_user,
            StoreLocation::LocalMachine => &self.local_machine,
        };
        root.join(name.dir_name())
    }

    /// Directory stores for the platform store set.
    pub fn platform_stores(&self) -> Vec<DirectoryStore> {
        platform_store_set()
            .into_iter()
            .map(|(location, name)| DirectoryStore::new(self.path_for(location, name)))
            .collect()
    }
}

impl Default for StoreRoots {
    fn default() -> Self {
        Self::platform_default()
    }
}

fn default_machine_root() -> PathBuf {
    if let Ok(dir) = std::env::var(MACHINE_STORE_ENV) {
        return PathBuf::from(dir);
    }
    if cfg!(windows) {
        std::env::var("PROGRAMDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(r"C:\ProgramData"))
            .join("Paygate")
            .join("certs")
    } else {
        PathBuf::from("/etc/paygate/certs")
    }
}

/// A certificate found in a store.
pub struct StoreEntry {
    pub certificate: Certificate,
    pub private_key: Option<PKey<Private>>,
    /// File the entry was read from.
    pub origin: PathBuf,
}

impl StoreEntry {
    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Convert into a key pair, if the entry has a private key.
    pub fn into_key_pair(self) -> Option<CryptoResult<KeyPair>> {
        let key = self.private_key?;
        Some(KeyPair::new(self.certificate, key))
    }
}

impl fmt::Debug for StoreEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreEntry")
            .field("certificate", &self.certificate)
            .field("has_private_key", &self.has_private_key())
            .field("origin", &self.origin)
            .finish()
    }
}

/// Source of certificates for the resolver.
pub trait CertificateStore: Send + Sync {
    /// Human-readable name, for logs.
    fn describe(&self) -> String;

    /// All certificates in scan order.
    fn entries(&self) -> CryptoResult<Vec<StoreEntry>>;
}

/// A store backed by a directory of certificate files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryStore {
    path: PathBuf,
}

impl DirectoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> CryptoResult<Vec<StoreEntry>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let origin = path.to_path_buf();

        match extension.as_str() {
            "pem" => {
                let bytes = std::fs::read(path)?;
                let mut key = PKey::private_key_from_pem(&bytes).ok();
                let mut entries = Vec::new();
                for x509 in X509::stack_from_pem(&bytes)? {
                    let certificate = Certificate::from_x509(x509)?;
                    // A bundled key belongs to the first certificate it matches.
                    let owns_key = match &key {
                        Some(k) => certificate.public_key()?.public_eq(k),
                        None => false,
                    };
                    let private_key = if owns_key { key.take() } else { None };
                    entries.push(StoreEntry {
                        certificate,
                        private_key,
                        origin: origin.clone(),
                    });
                }
                Ok(entries)
            }
            "crt" | "cer" | "der" => {
                let bytes = std::fs::read(path)?;
                let x509 = X509::from_der(&bytes).or_else(|_| X509::from_pem(&bytes))?;
                Ok(vec![StoreEntry {
                    certificate: Certificate::from_x509(x509)?,
                    private_key: None,
                    origin,
                }])
            }
            "pfx" | "p12" => {
                let bytes = std::fs::read(path)?;
                let parsed = Pkcs12::from_der(&bytes)?.parse2("")?;
                let Some(x509) = parsed.cert else {
                    return Ok(Vec::new());
                };
                Ok(vec![StoreEntry {
                    certificate: Certificate::from_x509(x509)?,
                    private_key: parsed.pkey,
                    origin,
                }])
            }
            _ => Ok(Vec::new()),
        }
    }
}

impl CertificateStore for DirectoryStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn entries(&self) -> CryptoResult<Vec<StoreEntry>> {
        let read_dir = match std::fs::read_dir(&self.path) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(store = %self.path.display(), "Certificate store does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        let mut entries = Vec::new();
        for file in files {
            match Self::read_file(&file) {
                Ok(found) => entries.extend(found),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Skipping unreadable certificate file");
                }
            }
        }
        Ok(entries)
    }
}
