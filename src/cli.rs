//! Command-line interface definition for oidclite
//!
//! This module defines the CLI structure using clap's derive API, providing
//! commands for discovery, building an authorization URL and exchanging the
//! returned authorization code.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Default location of the persisted authorization session.
pub const DEFAULT_SESSION_FILE: &str = ".oidclite-session.json";

/// oidclite - OpenID Connect authorization code + PKCE client
///
/// Resolves provider endpoints, prints an authorization URL for a browser to
/// open, and exchanges the returned code for tokens.
#[derive(Parser, Debug, Clone)]
#[command(name = "oidclite")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the provider discovery URL from config
    #[arg(long, global = true)]
    pub discovery_url: Option<String>,

    /// Derive the discovery URL from an issuer instead of passing it directly
    #[arg(long, global = true, conflicts_with = "discovery_url")]
    pub issuer: Option<String>,

    /// Override the client ID from config
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for oidclite
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Fetch the provider discovery document and print it as JSON
    Discover,

    /// Print an authorization URL and save the session for `exchange`
    Authorize {
        /// Where to write the authorization session
        #[arg(short, long, default_value = DEFAULT_SESSION_FILE)]
        session_file: PathBuf,
    },

    /// Exchange an authorization code for tokens
    Exchange {
        /// Authorization code returned by the provider
        #[arg(long, required_unless_present = "callback_url", conflicts_with = "callback_url")]
        code: Option<String>,

        /// Full redirect URL received by the browser; its state is validated
        #[arg(long)]
        callback_url: Option<String>,

        /// Session written by `authorize`
        #[arg(short, long, default_value = DEFAULT_SESSION_FILE)]
        session_file: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some(DEFAULT_CONFIG_PATH.to_string()),
            verbose: false,
            json_logs: false,
            discovery_url: None,
            issuer: None,
            client_id: None,
            command: Commands::Discover,
        }
    }
}
