//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Paygate protocol tools.
#[derive(Parser, Debug)]
#[command(name = "paygate")]
#[command(author = "Paygate Contributors")]
#[command(version)]
#[command(about = "Command-line tools for the Paygate signed-envelope protocol")]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "PAYGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (human or json).
    #[arg(short, long, global = true, default_value = "human")]
    pub format: OutputFormatArg,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormatArg {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the canonical JSON used as signature input.
    Canonicalize {
        /// JSON file to read ("-" or omitted for stdin).
        input: Option<PathBuf>,

        /// Normalize dates to UTC instead of the configured policy.
        #[arg(long)]
        utc: bool,
    },

    /// Show a certificate fingerprint.
    ///
    /// Reads a PEM/DER certificate file, or the configured client's certificate.
    Fingerprint {
        /// Certificate file (PEM or DER).
        #[arg(long, conflicts_with = "client")]
        cert: Option<PathBuf>,

        /// Configured client name (defaults to the first client).
        #[arg(long)]
        client: Option<String>,
    },

    /// Sign a JSON payload as a configured client.
    Sign {
        /// JSON payload file ("-" or omitted for stdin).
        input: Option<PathBuf>,

        /// Configured client name (defaults to the first client).
        #[arg(long)]
        client: Option<String>,

        /// Envelope validity in seconds.
        #[arg(long, default_value_t = paygate_wire::DEFAULT_EXPIRATION_SECS)]
        validity: i64,
    },

    /// Verify a signed envelope and print its payload.
    ///
    /// Without --cert, the signer's key is looked up on the gateway.
    Verify {
        /// Envelope file ("-" or omitted for stdin).
        input: Option<PathBuf>,

        /// Certificate file (PEM or DER) of the expected signer.
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Configured client used for gateway lookups.
        #[arg(long)]
        client: Option<String>,
    },

    /// Look up a gateway key by fingerprint.
    FetchKey {
        /// Certificate fingerprint (hex).
        fingerprint: String,

        /// Configured client used for the lookup.
        #[arg(long)]
        client: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sign() {
        let cli = Cli::try_parse_from(["paygate", "sign", "payload.json", "--client", "Acme"]).unwrap();
        match cli.command {
            Commands::Sign {
                input,
                client,
                validity,
            } => {
                assert_eq!(input, Some(PathBuf::from("payload.json")));
                assert_eq!(client.as_deref(), Some("Acme"));
                assert_eq!(validity, 600);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["paygate", "fetch-key", "0AFF", "-v", "--format", "json"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormatArg::Json));
    }

    #[test]
    fn test_fingerprint_cert_conflicts_with_client() {
        assert!(Cli::try_parse_from([
            "paygate",
            "fingerprint",
            "--cert",
            "a.pem",
            "--client",
            "Acme"
        ])
        .is_err());
    }
}
