/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `discover`  - Resolve and print the provider discovery document
- `authorize` - Print an authorization URL and persist its session
- `exchange`  - Exchange an authorization code for tokens

Handlers return `anyhow::Result` and write their output to stdout; logs go
to stderr.
*/

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::oidc::client::OidcClient;
use crate::oidc::session::AuthorizationSession;

/// Builds a client from `config` and resolves its endpoints.
async fn resolved_client(config: &Config) -> Result<OidcClient> {
    let client = OidcClient::from_config(config)?;
    client
        .resolve()
        .await
        .with_context(|| format!("Discovery failed for {}", config.client.discovery_url))?;
    Ok(client)
}

/// Writes `session` as JSON, readable only by the owner on unix.
pub fn save_session(path: &Path, session: &AuthorizationSession) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to open session file {}", path.display()))?;
    // `mode` only applies on creation; tighten a pre-existing file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict session file {}", path.display()))?;
    }
    let json = serde_json::to_vec_pretty(session)?;
    file.write_all(&json)
        .with_context(|| format!("Failed to write session file {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Saved authorization session");
    Ok(())
}

/// Reads a session written by [`save_session`].
pub fn load_session(path: &Path) -> Result<AuthorizationSession> {
    let contents = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read session file {} (run `oidclite authorize` first)",
            path.display()
        )
    })?;
    let session = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid session file {}", path.display()))?;
    Ok(session)
}

// Discover command handler
pub mod discover {
    //! Resolves the discovery document and prints it as JSON.

    use super::*;

    /// Run the discover command
    pub async fn run_discover(config: &Config) -> Result<()> {
        let client = resolved_client(config).await?;
        let document = client
            .discovery()
            .context("Discovery document missing after resolution")?;

        if !document.supports_s256() {
            tracing::warn!("Provider does not advertise S256 PKCE support");
        }

        println!("{}", serde_json::to_string_pretty(&document)?);
        Ok(())
    }
}

// Authorize command handler
pub mod authorize {
    //! Builds an authorization URL and saves the session for `exchange`.

    use super::*;

    /// Run the authorize command
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `session_file` - Where the session JSON is written
    pub async fn run_authorize(config: &Config, session_file: &Path) -> Result<()> {
        let client = resolved_client(config).await?;
        let request = client.try_authorization_request()?;

        save_session(session_file, &request.session)?;

        eprintln!("Open this URL in a browser to sign in:");
        println!("{}", request.url);
        Ok(())
    }
}

// Exchange command handler
pub mod exchange {
    //! Exchanges an authorization code and prints the token response.

    use super::*;
    use crate::oidc::channel;

    /// Where the authorization code comes from.
    #[derive(Debug, Clone)]
    pub enum CodeInput {
        /// A bare code; no state validation is possible.
        Code(String),
        /// The full redirect URL; its state is validated against the session.
        CallbackUrl(String),
    }

    /// Run the exchange command
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `session_file` - Session written by `authorize`
    /// * `input` - The code or the redirect URL carrying it
    pub async fn run_exchange(config: &Config, session_file: &Path, input: CodeInput) -> Result<()> {
        let session = load_session(session_file)?;
        let code = match input {
            CodeInput::Code(code) => {
                tracing::warn!("Exchanging a bare code; callback state was not validated");
                code
            }
            CodeInput::CallbackUrl(url) => session.validate_callback(&url)?,
        };

        let client = resolved_client(config).await?;
        let (sink, mut outcomes) = channel::unbounded();
        client.set_result_channel(sink);
        client.exchange(session, code);

        let tokens = outcomes
            .recv()
            .await
            .context("Token exchange finished without reporting an outcome")??;

        println!("{}", serde_json::to_string_pretty(&tokens)?);
        Ok(())
    }
}
