//! Gateway client settings.
//!
//! Settings are read from TOML. String values may reference environment
//! variables with `${VAR}`; unset variables are left as written.
//!
//! ```toml
//! gateway_url = "https://gateway.example.com/api"
//! client_name = "Acme"
//! certificate_name = "acme"
//! certificate_password = "${ACME_PFX_PASSWORD}"
//! certificate_path = "/etc/acme/certs"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use paygate_crypto::{default_data_dir, IdentitySource};
use paygate_wire::DateNormalization;
use regex::Regex;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{ProtocolError, ProtocolResult};

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Expand environment variables in a string.
/// Supports `${VAR_NAME}` syntax.
fn expand_env_vars(input: &str) -> String {
    let re = match Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") {
        Ok(re) => re,
        Err(_) => return input.to_string(),
    };
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

/// One client identity: the client name and where its certificate lives.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientCertificateSettings {
    pub client_name: String,
    /// Matched against certificate common names.
    pub certificate_name: String,
    /// PKCS#12 password, used only for the file fallback.
    pub certificate_password: Zeroizing<String>,
    /// Directory holding `{certificate_name}.pfx`.
    pub certificate_path: Option<PathBuf>,
}

impl ClientCertificateSettings {
    pub fn new(client_name: impl Into<String>, certificate_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            certificate_name: certificate_name.into(),
            certificate_password: Zeroizing::default(),
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

    pub fn to_identity_source(&self) -> IdentitySource {
        let mut source = IdentitySource::new(&self.client_name, &self.certificate_name)
            .with_password(self.certificate_password.as_str());
        if let Some(path) = &self.certificate_path {
            source = source.with_path(path.clone());
        }
        source
    }

    fn expand_env(&mut self) {
        self.certificate_password = Zeroizing::new(expand_env_vars(&self.certificate_password));
        if let Some(path) = &self.certificate_path {
            let expanded = expand_env_vars(&path.to_string_lossy());
            self.certificate_path = Some(PathBuf::from(expanded));
        }
    }
}

impl fmt::Debug for ClientCertificateSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificateSettings")
            .field("client_name", &self.client_name)
            .field("certificate_name", &self.certificate_name)
            .field("certificate_password", &"[REDACTED]")
            .field("certificate_path", &self.certificate_path)
            .finish()
    }
}

/// Gateway client settings loaded from TOML.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Base URL of the gateway; a trailing `/` is added when missing.
    pub gateway_url: String,
    pub client_name: String,
    pub certificate_name: String,
    pub certificate_password: Zeroizing<String>,
    pub certificate_path: Option<PathBuf>,
    /// How date-time strings are normalized before signing.
    pub date_normalization: DateNormalization,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Additional identities. When empty, the single-client fields are used.
    pub clients: Vec<ClientCertificateSettings>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            gateway_url: String::new(),
            client_name: String::new(),
            certificate_name: String::new(),
            certificate_password: Zeroizing::default(),
            certificate_path: None,
            clients: Vec::new(),
            date_normalization: DateNormalization::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("gateway_url", &self.gateway_url)
            .field("client_name", &self.client_name)
            .field("certificate_name", &self.certificate_name)
            .field("certificate_password", &"[REDACTED]")
            .field("certificate_path", &self.certificate_path)
            .field("clients", &self.clients)
            .field("date_normalization", &self.date_normalization)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GatewaySettings {
    /// Settings for a single client.
    pub fn new(gateway_url: impl Into<String>, client: ClientCertificateSettings) -> Self {
        let mut settings = Self::default();
        settings.gateway_url = gateway_url.into();
        settings.client_name = client.client_name.clone();
        settings.certificate_name = client.certificate_name.clone();
        settings.certificate_password = client.certificate_password.clone();
        settings.certificate_path = client.certificate_path.clone();
        settings
    }

    /// Load settings from a file.
    /// Environment variables in `${VAR}` format are expanded in the URL,
    /// passwords and paths.
    pub fn load(path: &Path) -> ProtocolResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse settings from TOML text, expanding `${VAR}` references.
    pub fn from_toml(contents: &str) -> ProtocolResult<Self> {
        let mut settings: Self = toml::from_str(contents)?;
        settings.expand_env();
        Ok(settings)
    }

    /// Load settings from the default location.
    pub fn load_default() -> ProtocolResult<Self> {
        Self::load(&default_config_path())
    }

    /// Save settings to a file.
    pub fn save(&self, path: &Path) -> ProtocolResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::config(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check that the settings can build a client.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.gateway_url.trim().is_empty() {
            return Err(ProtocolError::config("gateway_url must be set"));
        }
        if !self.gateway_url.starts_with("http://") && !self.gateway_url.starts_with("https://") {
            return Err(ProtocolError::config(format!(
                "gateway_url must be an http(s) URL, got '{}'",
                self.gateway_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ProtocolError::config("timeout_secs must be positive"));
        }

        let clients = self.clients();
        if clients.is_empty() {
            return Err(ProtocolError::config("no client is configured"));
        }
        for client in &clients {
            if client.client_name.trim().is_empty() {
                return Err(ProtocolError::config("client_name must be set"));
            }
            if client.certificate_name.trim().is_empty() {
                return Err(ProtocolError::config(format!(
                    "certificate_name must be set for client '{}'",
                    client.client_name
                )));
            }
        }
        Ok(())
    }

    /// Configured identities, falling back to the single-client fields.
    pub fn clients(&self) -> Vec<ClientCertificateSettings> {
        if !self.clients.is_empty() {
            return self.clients.clone();
        }
        if self.client_name.trim().is_empty() && self.certificate_name.trim().is_empty() {
            return Vec::new();
        }
        vec![ClientCertificateSettings {
            client_name: self.client_name.clone(),
            certificate_name: self.certificate_name.clone(),
            certificate_password: self.certificate_password.clone(),
            certificate_path: self.certificate_path.clone(),
        }]
    }

    /// Identity sources for every configured client.
    pub fn identity_sources(&self) -> Vec<IdentitySource> {
        self.clients()
            .iter()
            .map(ClientCertificateSettings::to_identity_source)
            .collect()
    }

    /// Gateway URL with a trailing `/`.
    pub fn normalized_gateway_url(&self) -> String {
        normalize_gateway_url(&self.gateway_url)
    }

    fn expand_env(&mut self) {
        self.gateway_url = expand_env_vars(&self.gateway_url);
        self.certificate_password = Zeroizing::new(expand_env_vars(&self.certificate_password));
        if let Some(path) = &self.certificate_path {
            let expanded = expand_env_vars(&path.to_string_lossy());
            self.certificate_path = Some(PathBuf::from(expanded));
        }
        for client in &mut self.clients {
            client.expand_env();
        }
    }
}

/// Append a trailing `/` when missing.
pub fn normalize_gateway_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Get the default settings file path.
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = GatewaySettings::default();
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(settings.date_normalization, DateNormalization::Local);
        assert!(settings.clients().is_empty());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");
        let settings = GatewaySettings::load(&path).unwrap();
        assert!(settings.gateway_url.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut settings = GatewaySettings::new(
            "https://gateway.example.com",
            ClientCertificateSettings::new("Acme", "acme").with_path("/etc/acme"),
        );
        settings.date_normalization = DateNormalization::Utc;
        settings.save(&path).unwrap();

        let loaded = GatewaySettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_password_survives_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let settings = GatewaySettings::new(
            "https://gateway.example.com",
            ClientCertificateSettings::new("Acme", "acme").with_password("s3cret"),
        );
        settings.save(&path).unwrap();

        let loaded = GatewaySettings::load(&path).unwrap();
        assert_eq!(loaded.certificate_password.as_str(), "s3cret");
        assert_eq!(loaded.clients()[0].certificate_password.as_str(), "s3cret");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let settings = GatewaySettings::from_toml(
            r#"
            gateway_url = "https://gateway.example.com"

            [[clients]]
            client_name = "Acme"
            "#,
        )
        .unwrap();

        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(settings.certificate_password.is_empty());
        assert!(settings.clients[0].certificate_name.is_empty());
        assert!(settings.clients[0].certificate_password.is_empty());
        assert_eq!(settings.clients[0].certificate_path, None);
    }

    #[test]
    fn test_single_client_fallback() {
        let settings = GatewaySettings::from_toml(
            r#"
            gateway_url = "https://gateway.example.com"
            client_name = "Acme"
            certificate_name = "acme"
            certificate_password = "secret"
            certificate_path = "/certs"
            "#,
        )
        .unwrap();

        let clients = settings.clients();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].client_name, "Acme");
        assert_eq!(clients[0].certificate_path, Some(PathBuf::from("/certs")));
        settings.validate().unwrap();
    }

    #[test]
    fn test_clients_list_wins() {
        let settings = GatewaySettings::from_toml(
            r#"
            gateway_url = "https://gateway.example.com"
            client_name = "Ignored"
            certificate_name = "ignored"

            [[clients]]
            client_name = "Acme"
            certificate_name = "acme"

            [[clients]]
            client_name = "Globex"
            certificate_name = "globex"
            "#,
        )
        .unwrap();

        let names: Vec<_> = settings.clients().into_iter().map(|c| c.client_name.clone()).collect();
        assert_eq!(names, vec!["Acme", "Globex"]);
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("PAYGATE_TEST_PFX_PASSWORD", "hunter2");
        let settings = GatewaySettings::from_toml(
            r#"
            gateway_url = "https://gateway.example.com"
            certificate_password = "${PAYGATE_TEST_PFX_PASSWORD}"

            [[clients]]
            client_name = "Acme"
            certificate_name = "acme"
            certificate_password = "${PAYGATE_TEST_PFX_PASSWORD}-2"
            "#,
        )
        .unwrap();

        assert_eq!(settings.certificate_password.as_str(), "hunter2");
        assert_eq!(settings.clients[0].certificate_password.as_str(), "hunter2-2");
    }

    #[test]
    fn test_unset_variable_left_as_is() {
        let expanded = expand_env_vars("${PAYGATE_TEST_SURELY_UNSET_VAR}");
        assert_eq!(expanded, "${PAYGATE_TEST_SURELY_UNSET_VAR}");
    }

    #[test]
    fn test_date_normalization_from_toml() {
        let settings = GatewaySettings::from_toml(r#"date_normalization = "utc""#).unwrap();
        assert_eq!(settings.date_normalization, DateNormalization::Utc);
    }

    #[test]
    fn test_validate_errors() {
        let mut settings = GatewaySettings::new(
            "ftp://gateway.example.com",
            ClientCertificateSettings::new("Acme", "acme"),
        );
        assert!(matches!(settings.validate(), Err(ProtocolError::Config(_))));

        settings.gateway_url = "https://gateway.example.com".into();
        settings.validate().unwrap();

        settings.certificate_name = " ".into();
        assert!(settings.validate().is_err());

        settings.certificate_name = "acme".into();
        settings.timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_normalize_gateway_url() {
        assert_eq!(normalize_gateway_url("https://g.example/api"), "https://g.example/api/");
        assert_eq!(normalize_gateway_url("https://g.example/api/"), "https://g.example/api/");
    }

    #[test]
    fn test_debug_redacts_password() {
        let client = ClientCertificateSettings::new("Acme", "acme").with_password("hunter2");
        let settings = GatewaySettings::new("https://g.example", client.clone());
        assert!(!format!("{client:?}").contains("hunter2"));
        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}
