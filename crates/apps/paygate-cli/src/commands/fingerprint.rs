//! Certificate fingerprint command.

use std::path::Path;

use paygate_crypto::Certificate;

use crate::context::{read_certificate, CliContext};
use crate::error::CliResult;
use crate::output::{KeyOutput, OutputFormat, Render};

/// Execute the fingerprint command.
///
/// With `cert`, reads a certificate file; otherwise loads the configured client.
pub fn fingerprint(
    ctx: &CliContext,
    format: OutputFormat,
    cert: Option<&Path>,
    client: Option<&str>,
) -> CliResult<String> {
    let output = match cert {
        Some(path) => key_output(&read_certificate(path)?, None)?,
        None => {
            let client = ctx.client(client)?;
            key_output(
                client.identity().key_pair().certificate(),
                Some(client.client_name().to_string()),
            )?
        }
    };
    Ok(output.render(format))
}

pub(crate) fn key_output(certificate: &Certificate, client: Option<String>) -> CliResult<KeyOutput> {
    let info = certificate.public_key_info()?;
    Ok(KeyOutput {
        fingerprint: info.fingerprint.to_string(),
        client,
        subject: certificate.subject_common_names(),
        issuer: certificate.issuer_common_names(),
        key: info.key,
    })
}
