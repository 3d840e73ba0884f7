//! oidclite - OpenID Connect authorization code + PKCE client
//!
#![doc = "oidclite - OpenID Connect authorization code + PKCE client"]
#![doc = "Main entry point for the oidclite command-line driver."]

use anyhow::Result;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use oidclite::cli::{Cli, Commands};
use oidclite::commands;
use oidclite::config::{Config, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Discover => {
            tracing::info!("Resolving provider discovery document");
            commands::discover::run_discover(&config).await?;
            Ok(())
        }
        Commands::Authorize { session_file } => {
            tracing::info!("Building authorization URL");
            commands::authorize::run_authorize(&config, &session_file).await?;
            Ok(())
        }
        Commands::Exchange {
            code,
            callback_url,
            session_file,
        } => {
            tracing::info!("Exchanging authorization code");
            let input = match (code, callback_url) {
                (_, Some(url)) => commands::exchange::CodeInput::CallbackUrl(url),
                (Some(code), None) => commands::exchange::CodeInput::Code(code),
                (None, None) => anyhow::bail!("either --code or --callback-url is required"),
            };
            commands::exchange::run_exchange(&config, &session_file, input).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so stdout carries only command output.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "oidclite=debug" } else { "oidclite=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
