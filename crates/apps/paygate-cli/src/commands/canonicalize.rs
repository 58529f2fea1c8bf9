//! Canonical JSON command.

use paygate_wire::{Canonicalizer, DateNormalization};
use serde_json::Value;

use crate::context::CliContext;
use crate::error::CliResult;
use crate::output::{CanonicalOutput, OutputFormat, Render};

/// Execute the canonicalize command on JSON text.
pub fn canonicalize(ctx: &CliContext, format: OutputFormat, input: &str, utc: bool) -> CliResult<String> {
    let dates = if utc {
        DateNormalization::Utc
    } else {
        ctx.settings.date_normalization
    };
    let value: Value = serde_json::from_str(input)?;
    let canonical = Canonicalizer::new(dates).to_canonical_string(&value)?;
    Ok(CanonicalOutput { canonical }.render(format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_client::GatewaySettings;

    #[test]
    fn test_canonicalize_sorts_and_drops_nulls() {
        let ctx = CliContext::new(GatewaySettings::default());
        let output = canonicalize(
            &ctx,
            OutputFormat::Human,
            r#"{ "currency": "UYU", "amount": 100, "note": null, "items": [{"b": 2, "a": 1}] }"#,
            false,
        )
        .unwrap();
        assert_eq!(output, r#"{"amount":100,"currency":"UYU","items":[{"a":1,"b":2}]}"#);
    }

    #[test]
    fn test_canonicalize_utc_dates() {
        let ctx = CliContext::new(GatewaySettings::default());
        let output = canonicalize(
            &ctx,
            OutputFormat::Human,
            r#"{"When": "2024-01-15T10:30:00.500-03:00"}"#,
            true,
        )
        .unwrap();
        assert_eq!(output, r#"{"When":"2024-01-15T13:30:00.5Z"}"#);
    }

    #[test]
    fn test_canonicalize_invalid_json() {
        let ctx = CliContext::new(GatewaySettings::default());
        assert!(canonicalize(&ctx, OutputFormat::Human, "{", false).is_err());
    }
}
