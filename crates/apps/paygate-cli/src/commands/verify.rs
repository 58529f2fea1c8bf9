//! Verify command.

use std::path::Path;

use paygate_crypto::VerificationKey;
use paygate_wire::RawEnvelope;
use serde_json::Value;

use crate::context::{read_certificate, CliContext};
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, Render, VerifyOutput};

/// Execute the verify command.
///
/// The signer key comes from `cert` when given, otherwise from the gateway.
pub async fn verify(
    ctx: &CliContext,
    format: OutputFormat,
    input: &str,
    cert: Option<&Path>,
    client: Option<&str>,
) -> CliResult<String> {
    let envelope = RawEnvelope::from_slice(input.as_bytes())?;

    let payload: Value = match cert {
        Some(path) => {
            let key = VerificationKey::from_certificate(read_certificate(path)?)?;
            if key.fingerprint() != envelope.fingerprint() {
                return Err(CliError::config(format!(
                    "envelope was signed by {}, certificate is {}",
                    envelope.fingerprint(),
                    key.fingerprint()
                )));
            }
            ctx.engine().verify_raw(&key, &envelope)?
        }
        None => {
            let client = ctx.client(client)?;
            let key = client.fetch_key(envelope.fingerprint()).await?;
            client.engine().verify_raw(&key, &envelope)?
        }
    };

    let output = VerifyOutput {
        signer: envelope.fingerprint().to_string(),
        expiration: envelope.expiration(),
        payload,
    };
    Ok(output.render(format))
}
