//! Command-line tools for the Paygate signed-envelope protocol.
//!
//! This crate provides the `paygate` binary:
//!
//! - **canonicalize**: print the canonical form of a JSON document
//! - **fingerprint**: show the fingerprint of a certificate or configured client
//! - **sign**: wrap a JSON payload in a signed envelope
//! - **verify**: check an envelope and print its payload
//! - **fetch-key**: look up a gateway key by fingerprint
//!
//! # Quick Start
//!
//! ```bash
//! # Canonical signature input
//! echo '{"b":1,"a":2}' | paygate canonicalize
//!
//! # Sign as the configured client
//! paygate sign payload.json > envelope.json
//!
//! # Verify with a certificate file
//! paygate verify envelope.json --cert acme.pem
//! ```
//!
//! # Configuration
//!
//! Settings are loaded from `config.toml` in the Paygate data directory
//! (`PAYGATE_DATA_DIR` overrides it). Override the file with `--config`.

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, OutputFormatArg};
pub use context::CliContext;
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, Render};
