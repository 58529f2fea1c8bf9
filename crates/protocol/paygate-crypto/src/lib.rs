//! Cryptography for the Paygate signed-envelope protocol.
//!
//! This crate provides:
//!
//! - **Certificates** ([`Certificate`], [`KeyPair`], [`VerificationKey`]):
//!   X.509/RSA key handles and SHA-1 fingerprints
//! - **Stores** ([`CertificateStore`], [`DirectoryStore`]): where signing
//!   certificates are installed
//! - **Resolution** ([`CertificateResolver`]): find a certificate by name, with
//!   a PKCS#12 file fallback
//! - **Identities** ([`SigningIdentity`], [`IdentityRegistry`]): client names
//!   bound to key pairs
//! - **Signatures** ([`SignatureEngine`]): RSA-SHA512 PKCS#1 v1.5 envelopes with
//!   expiration
//!
//! # Example
//!
//! ```no_run
//! use paygate_crypto::{CertificateResolver, IdentitySource, SignatureEngine, SigningIdentity};
//!
//! let source = IdentitySource::new("Acme", "acme")
//!     .with_password("secret")
//!     .with_path("/etc/acme/certs");
//! let identity = SigningIdentity::load(&source, &CertificateResolver::platform_default()).unwrap();
//!
//! let envelope = SignatureEngine::default()
//!     .sign(identity.key_pair(), serde_json::json!({"amount": 100}))
//!     .unwrap();
//! println!("{}", envelope.signature);
//! ```

mod certificate;
mod engine;
mod error;
mod identity;
mod resolver;
mod store;

pub use certificate::{Certificate, KeyPair, VerificationKey, DEFAULT_KEY_BITS};
pub use engine::SignatureEngine;
pub use error::{CryptoError, CryptoResult};
pub use identity::{IdentityRegistry, IdentitySource, SigningIdentity};
pub use resolver::CertificateResolver;
pub use store::{
    default_data_dir, platform_store_set, CertificateStore, DirectoryStore, StoreEntry,
    StoreLocation, StoreName, StoreRoots, DATA_DIR_ENV, MACHINE_STORE_ENV,
};
