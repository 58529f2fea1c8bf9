//! Sign command.

use serde_json::Value;
use tracing::debug;

use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::{EnvelopeOutput, OutputFormat, Render};

/// Execute the sign command: wrap the JSON `input` in an envelope signed by `client`.
pub fn sign(
    ctx: &CliContext,
    format: OutputFormat,
    input: &str,
    client: Option<&str>,
    validity_secs: i64,
) -> CliResult<String> {
    let payload: Value = serde_json::from_str(input)?;
    let client = ctx.client(client)?;
    let engine = ctx.engine().with_validity(validity_secs);

    let envelope = engine.sign(client.identity().key_pair(), payload)?;
    debug!(
        client = client.client_name(),
        fingerprint = %envelope.fingerprint(),
        expiration = envelope.expiration(),
        "Payload signed"
    );
    let envelope = serde_json::to_value(&envelope)?;
    Ok(EnvelopeOutput { envelope }.render(format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_crypto::{CertificateResolver, SignatureEngine};
    use paygate_test_utils::{client_key_pair, test_settings};
    use paygate_wire::RawEnvelope;
    use tempfile::TempDir;

    #[test]
    fn test_sign_produces_verifiable_envelope() {
        let dir = TempDir::new().unwrap();
        let ctx = CliContext::with_resolver(
            test_settings(dir.path()),
            CertificateResolver::without_stores(),
        );

        let output = sign(
            &ctx,
            OutputFormat::Human,
            r#"{"amount": 100, "currency": "UYU"}"#,
            None,
            600,
        )
        .unwrap();

        let envelope = RawEnvelope::from_slice(output.as_bytes()).unwrap();
        assert_eq!(envelope.fingerprint(), client_key_pair().fingerprint());
        let key = client_key_pair().verification_key().unwrap();
        let payload: Value = SignatureEngine::default().verify_raw(&key, &envelope).unwrap();
        assert_eq!(payload["currency"], "UYU");
    }

    #[test]
    fn test_sign_unknown_client() {
        let dir = TempDir::new().unwrap();
        let ctx = CliContext::with_resolver(
            test_settings(dir.path()),
            CertificateResolver::without_stores(),
        );
        let err = sign(&ctx, OutputFormat::Human, "{}", Some("Globex"), 600).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
