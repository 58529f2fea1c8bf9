//! Shared state for commands: settings and where certificates are found.

use std::io::Read;
use std::path::Path;

use paygate_client::{ClientFactory, GatewayClient, GatewaySettings};
use paygate_crypto::{Certificate, CertificateResolver, SignatureEngine};
use paygate_wire::Canonicalizer;

use crate::error::{CliError, CliResult};

/// Settings plus the certificate resolver used to load identities.
pub struct CliContext {
    pub settings: GatewaySettings,
    resolver: CertificateResolver,
}

impl CliContext {
    /// Context searching the platform certificate stores.
    pub fn new(settings: GatewaySettings) -> Self {
        Self::with_resolver(settings, CertificateResolver::platform_default())
    }

    pub fn with_resolver(settings: GatewaySettings, resolver: CertificateResolver) -> Self {
        Self { settings, resolver }
    }

    /// Signature engine honoring the configured date normalization.
    pub fn engine(&self) -> SignatureEngine {
        SignatureEngine::new(Canonicalizer::new(self.settings.date_normalization))
    }

    /// Client for `name`, or for the client declared first in the settings.
    pub fn client(&self, name: Option<&str>) -> CliResult<GatewayClient> {
        let factory = ClientFactory::from_settings_with_resolver(&self.settings, &self.resolver)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => self
                .settings
                .clients()
                .first()
                .map(|c| c.client_name.trim().to_string())
                .ok_or_else(|| CliError::config("no client is configured"))?,
        };
        Ok(factory.get(&name)?)
    }
}

/// Read a file, or stdin for `None` and `-`.
pub fn read_input(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            if !path.exists() {
                return Err(CliError::FileNotFound(path.display().to_string()));
            }
            Ok(std::fs::read_to_string(path)?)
        }
        _ => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Load a PEM or DER certificate file.
pub fn read_certificate(path: &Path) -> CliResult<Certificate> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    let certificate = if bytes.starts_with(b"-----BEGIN") {
        Certificate::from_pem(&bytes)?
    } else {
        Certificate::from_der(&bytes)?
    };
    Ok(certificate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_client::ClientCertificateSettings;
    use paygate_test_utils::{
        client_key_pair, generate_key_pair, test_settings, write_pem, write_pfx, CLIENT_NAME,
    };
    use tempfile::TempDir;

    #[test]
    fn test_client_defaults_to_first() {
        let dir = TempDir::new().unwrap();
        let ctx = CliContext::with_resolver(
            test_settings(dir.path()),
            CertificateResolver::without_stores(),
        );
        assert_eq!(ctx.client(None).unwrap().client_name(), CLIENT_NAME);
        assert!(matches!(
            ctx.client(Some("Globex")),
            Err(CliError::Protocol(_))
        ));
    }

    #[test]
    fn test_client_defaults_to_declaration_order() {
        let dir = TempDir::new().unwrap();
        write_pfx(dir.path(), "zeta", &generate_key_pair("Zeta"), "pw");
        write_pfx(dir.path(), "acme", client_key_pair(), "pw");

        let mut settings = GatewaySettings::default();
        settings.gateway_url = "https://gateway.test/api".into();
        settings.clients = vec![
            ClientCertificateSettings::new("Zeta", "zeta")
                .with_password("pw")
                .with_path(dir.path()),
            ClientCertificateSettings::new(CLIENT_NAME, "acme")
                .with_password("pw")
                .with_path(dir.path()),
        ];

        let ctx = CliContext::with_resolver(settings, CertificateResolver::without_stores());
        assert_eq!(ctx.client(None).unwrap().client_name(), "Zeta");
        assert_eq!(ctx.client(Some(CLIENT_NAME)).unwrap().client_name(), CLIENT_NAME);
    }

    #[test]
    fn test_read_certificate_pem_and_der() {
        let dir = TempDir::new().unwrap();
        let pem = write_pem(dir.path(), "acme.pem", client_key_pair());
        let der = dir.path().join("acme.der");
        std::fs::write(&der, client_key_pair().certificate().to_der().unwrap()).unwrap();

        for path in [pem, der] {
            let certificate = read_certificate(&path).unwrap();
            assert_eq!(certificate.fingerprint(), client_key_pair().fingerprint());
        }
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_input(Some(Path::new("/nonexistent/payload.json"))).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }
}
