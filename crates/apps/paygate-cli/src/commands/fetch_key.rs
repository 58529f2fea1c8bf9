//! Gateway key lookup command.

use paygate_wire::Fingerprint;

use crate::commands::fingerprint::key_output;
use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::{OutputFormat, Render};

/// Execute the fetch-key command.
pub async fn fetch_key(
    ctx: &CliContext,
    format: OutputFormat,
    fingerprint: &str,
    client: Option<&str>,
) -> CliResult<String> {
    let fingerprint: Fingerprint = fingerprint.into();
    let client = ctx.client(client)?;
    let key = client.fetch_key(&fingerprint).await?;
    Ok(key_output(key.certificate(), None)?.render(format))
}
