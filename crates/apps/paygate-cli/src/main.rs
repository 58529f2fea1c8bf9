//! Paygate CLI binary entry point.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paygate_cli::{
    cli::{Cli, Commands},
    commands,
    context::{read_input, CliContext},
    error::{CliError, CliResult},
    output::OutputFormat,
};
use paygate_client::{default_config_path, GatewaySettings};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on --verbose flag or RUST_LOG env var
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if cli.verbose || has_rust_log {
        let mut filter = EnvFilter::from_default_env();
        if cli.verbose {
            if let Ok(directive) = "paygate=debug".parse() {
                filter = filter.add_directive(directive);
            }
        }
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    match run(cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            print_error(&e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Print the error with its result code and a recovery hint.
fn print_error(e: &CliError) {
    eprintln!("Error [{}]: {}", e.result_code(), e);
    if let Some(hint) = e.hint() {
        eprintln!("Hint: {}", hint);
    }
}

async fn run(cli: Cli) -> CliResult<String> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let settings = GatewaySettings::load(&config_path)?;
    let ctx = CliContext::new(settings);
    let format: OutputFormat = cli.format.into();

    match cli.command {
        Commands::Canonicalize { input, utc } => {
            let text = read_input(input.as_deref())?;
            commands::canonicalize(&ctx, format, &text, utc)
        }
        Commands::Fingerprint { cert, client } => {
            commands::fingerprint(&ctx, format, cert.as_deref(), client.as_deref())
        }
        Commands::Sign {
            input,
            client,
            validity,
        } => {
            let text = read_input(input.as_deref())?;
            commands::sign(&ctx, format, &text, client.as_deref(), validity)
        }
        Commands::Verify {
            input,
            cert,
            client,
        } => {
            let text = read_input(input.as_deref())?;
            commands::verify(&ctx, format, &text, cert.as_deref(), client.as_deref()).await
        }
        Commands::FetchKey {
            fingerprint,
            client,
        } => commands::fetch_key(&ctx, format, &fingerprint, client.as_deref()).await,
    }
}
