//! Output formatting for CLI.

use paygate_wire::PublicKeyInfo;
use serde::Serialize;
use serde_json::Value;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use 'human' or 'json'.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Trait for renderable output.
pub trait Render {
    /// Render as human-readable string.
    fn render_human(&self) -> String;

    /// Render as JSON string.
    fn render_json(&self) -> String;

    /// Render in the specified format.
    fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Human => self.render_human(),
            OutputFormat::Json => self.render_json(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

// =============================================================================
// Output Types
// =============================================================================

/// Output for the canonicalize command.
#[derive(Debug, Serialize)]
pub struct CanonicalOutput {
    pub canonical: String,
}

impl Render for CanonicalOutput {
    fn render_human(&self) -> String {
        self.canonical.clone()
    }

    fn render_json(&self) -> String {
        to_json(self)
    }
}

/// Output for the fingerprint and fetch-key commands.
#[derive(Debug, Serialize)]
pub struct KeyOutput {
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    pub subject: Vec<String>,
    pub issuer: Vec<String>,
    /// Base64 DER certificate.
    pub key: String,
}

impl KeyOutput {
    pub fn public_key_info(&self) -> PublicKeyInfo {
        PublicKeyInfo {
            fingerprint: self.fingerprint.as_str().into(),
            key: self.key.clone(),
        }
    }
}

impl Render for KeyOutput {
    fn render_human(&self) -> String {
        let mut lines = Vec::new();
        if let Some(client) = &self.client {
            lines.push(format!("Client:      {}", client));
        }
        lines.push(format!("Fingerprint: {}", self.fingerprint));
        lines.push(format!("Subject:     {}", self.subject.join(", ")));
        lines.push(format!("Issuer:      {}", self.issuer.join(", ")));
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        to_json(self)
    }
}

/// Output for the sign command: the envelope itself.
#[derive(Debug)]
pub struct EnvelopeOutput {
    pub envelope: Value,
}

impl Render for EnvelopeOutput {
    fn render_human(&self) -> String {
        self.envelope.to_string()
    }

    fn render_json(&self) -> String {
        to_json(&self.envelope)
    }
}

/// Output for the verify command.
#[derive(Debug, Serialize)]
pub struct VerifyOutput {
    pub signer: String,
    pub expiration: i64,
    pub payload: Value,
}

impl Render for VerifyOutput {
    fn render_human(&self) -> String {
        format!(
            "Signature valid\nSigner:     {}\nExpiration: {}\nPayload:    {}",
            self.signer, self.expiration, self.payload
        )
    }

    fn render_json(&self) -> String {
        to_json(self)
    }
}
