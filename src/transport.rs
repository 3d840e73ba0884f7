//! HTTP transport shared by discovery and token exchange
//!
//! Every request the client issues goes through one ephemeral
//! `reqwest::Client`: no cookie store and no persisted credentials.

use std::time::Duration;

use reqwest::StatusCode;

use crate::config::HttpConfig;
use crate::error::Result;

/// Builds the ephemeral HTTP client described by `config`.
///
/// Timeouts left unset fall back to the transport defaults.
///
/// # Errors
///
/// Returns [`OidcError::Transport`](crate::error::OidcError::Transport) if
/// the TLS backend cannot be initialised.
///
/// # Examples
///
/// ```
/// use oidclite::config::HttpConfig;
/// use oidclite::transport::build_client;
///
/// let client = build_client(&HttpConfig::default());
/// assert!(client.is_ok());
/// ```
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());

    if let Some(secs) = config.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = config.connect_timeout_seconds {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }

    let client = builder.build()?;
    tracing::debug!(
        user_agent = %config.user_agent,
        timeout_seconds = ?config.timeout_seconds,
        "Built HTTP client"
    );
    Ok(client)
}

/// Canonical reason phrase for `status`, or the bare code when there is none.
pub(crate) fn describe_status(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}
