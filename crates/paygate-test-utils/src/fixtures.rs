//! Certificate and client fixtures.
//!
//! Key pairs are generated at runtime and memoized per process, since RSA
//! key generation dominates test time.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use paygate_client::{ClientCertificateSettings, GatewayClient, GatewaySettings};
use paygate_crypto::{KeyPair, SigningIdentity};

use crate::MockGateway;

/// Client name used by [`client_key_pair`].
pub const CLIENT_NAME: &str = "Acme";

/// Password used by [`write_pfx`] in [`test_settings`].
pub const PFX_PASSWORD: &str = "acme-secret";

/// Generate a fresh self-signed key pair.
pub fn generate_key_pair(common_name: &str) -> KeyPair {
    KeyPair::generate_self_signed(common_name, 30).expect("generate key pair")
}

/// The client's signing key ("Acme").
pub fn client_key_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| generate_key_pair(CLIENT_NAME))
}

/// The gateway's signing key.
pub fn gateway_key_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| generate_key_pair("Gateway Signing"))
}

/// A second gateway key, used for rotation and chain-of-trust tests.
pub fn rotated_gateway_key_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| generate_key_pair("Gateway Signing 2"))
}

/// A key nobody trusts.
pub fn intruder_key_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| generate_key_pair("Intruder"))
}

/// The "Acme" signing identity.
pub fn client_identity() -> Arc<SigningIdentity> {
    Arc::new(SigningIdentity::new(CLIENT_NAME, client_key_pair().clone()))
}

/// A client signing as "Acme" over `gateway`, with an empty key cache.
pub fn test_client(gateway: &MockGateway) -> GatewayClient {
    GatewayClient::new(client_identity(), Arc::new(gateway.clone()))
}

/// Write `pair` as `{dir}/{file_stem}.pfx`.
pub fn write_pfx(dir: &Path, file_stem: &str, pair: &KeyPair, password: &str) -> PathBuf {
    let der = pair.to_pkcs12(file_stem, password).expect("encode pkcs12");
    let path = dir.join(format!("{file_stem}.pfx"));
    std::fs::write(&path, der).expect("write pfx");
    path
}

/// Write `pair` (certificate and private key) as PEM to `{dir}/{file_name}`.
pub fn write_pem(dir: &Path, file_name: &str, pair: &KeyPair) -> PathBuf {
    let pem = pair.to_pem().expect("encode pem");
    let path = dir.join(file_name);
    std::fs::write(&path, pem).expect("write pem");
    path
}

/// Settings for "Acme" whose certificate is a PFX file in `dir`.
pub fn test_settings(dir: &Path) -> GatewaySettings {
    write_pfx(dir, "acme", client_key_pair(), PFX_PASSWORD);
    GatewaySettings::new(
        "https://gateway.test/api",
        ClientCertificateSettings::new(CLIENT_NAME, "acme")
            .with_password(PFX_PASSWORD)
            .with_path(dir),
    )
}
