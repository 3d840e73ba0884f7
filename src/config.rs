//! Configuration management for oidclite
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{OidcError, Result};
use crate::oidc::discovery::well_known_url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use url::Url;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/oidclite.yaml";

/// Redirect URI used when the configuration does not name one.
pub const DEFAULT_REDIRECT_URI: &str = "oidclite://openID";

/// Scopes requested when the configuration does not name any.
pub const DEFAULT_SCOPES: [&str; 4] = ["openid", "profile", "email", "offline_access"];

/// Main configuration structure for oidclite
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OpenID Connect client settings
    #[serde(default)]
    pub client: ClientConfiguration,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// Immutable client configuration.
///
/// An [`OidcClient`](crate::oidc::client::OidcClient) takes its own copy at
/// construction and never changes it afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfiguration {
    /// URL of the provider's OpenID Connect discovery document
    #[serde(default)]
    pub discovery_url: String,

    /// OAuth client identifier
    #[serde(default)]
    pub client_id: String,

    /// Optional client secret for confidential clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Redirect URI registered with the provider (custom scheme)
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Requested scopes, in request order
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self {
            discovery_url: String::new(),
            client_id: String::new(),
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
        }
    }
}

impl fmt::Debug for ClientConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfiguration")
            .field("discovery_url", &self.discovery_url)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl ClientConfiguration {
    /// Creates a configuration with the default redirect URI and scopes.
    ///
    /// # Examples
    ///
    /// ```
    /// use oidclite::config::{ClientConfiguration, DEFAULT_REDIRECT_URI};
    ///
    /// let config = ClientConfiguration::new(
    ///     "https://idp.example.com/.well-known/openid-configuration",
    ///     "my-client",
    /// );
    /// assert_eq!(config.redirect_uri, DEFAULT_REDIRECT_URI);
    /// assert_eq!(config.scope_string(), "openid profile email offline_access");
    /// ```
    pub fn new(discovery_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            discovery_url: discovery_url.into(),
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Sets the client secret.
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Replaces the requested scopes.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Space-joined scope list as sent in the `scope` parameter.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Parsed discovery URL.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::InvalidEndpointUrl`] when the URL does not parse.
    pub fn discovery_endpoint(&self) -> Result<Url> {
        Url::parse(&self.discovery_url)
            .map_err(|e| OidcError::invalid_endpoint(&self.discovery_url, e))
    }

    /// Validate the client configuration
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Config`] when the discovery URL is not an
    /// http(s) URL, the client ID is empty, the scope list is empty or holds
    /// blank or whitespace-containing entries, or the redirect URI is not a
    /// custom-scheme URL.
    pub fn validate(&self) -> Result<()> {
        let discovery = Url::parse(&self.discovery_url).map_err(|e| {
            OidcError::Config(format!(
                "client.discovery_url '{}' is not a valid URL: {}",
                self.discovery_url, e
            ))
        })?;
        if !matches!(discovery.scheme(), "http" | "https") {
            return Err(OidcError::Config(format!(
                "client.discovery_url must use http or https, got '{}'",
                discovery.scheme()
            )));
        }

        if self.client_id.trim().is_empty() {
            return Err(OidcError::Config(
                "client.client_id cannot be empty".to_string(),
            ));
        }

        if self.scopes.is_empty() {
            return Err(OidcError::Config(
                "client.scopes must contain at least one scope".to_string(),
            ));
        }
        if let Some(bad) = self
            .scopes
            .iter()
            .find(|s| s.is_empty() || s.chars().any(char::is_whitespace))
        {
            return Err(OidcError::Config(format!(
                "client.scopes entry '{}' must be a single non-empty token",
                bad
            )));
        }

        let redirect = Url::parse(&self.redirect_uri).map_err(|e| {
            OidcError::Config(format!(
                "client.redirect_uri '{}' is not a valid URL: {}",
                self.redirect_uri, e
            ))
        })?;
        if matches!(redirect.scheme(), "http" | "https") {
            return Err(OidcError::Config(format!(
                "client.redirect_uri must use a custom scheme, got '{}'",
                redirect.scheme()
            )));
        }

        Ok(())
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds; transport default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Connect timeout in seconds; transport default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_seconds: Option<u64>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("oidclite/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            connect_timeout_seconds: None,
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    /// Validate the transport configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == Some(0) {
            return Err(OidcError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.connect_timeout_seconds == Some(0) {
            return Err(OidcError::Config(
                "http.connect_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(OidcError::Config(
                "http.user_agent cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Io`] if the file exists but cannot be read,
    /// [`OidcError::Yaml`] if it cannot be parsed, and
    /// [`OidcError::InvalidEndpointUrl`] for an unparseable `--issuer`.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli)?;

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(discovery_url) = std::env::var("OIDCLITE_DISCOVERY_URL") {
            self.client.discovery_url = discovery_url;
        }

        if let Ok(client_id) = std::env::var("OIDCLITE_CLIENT_ID") {
            self.client.client_id = client_id;
        }

        if let Ok(secret) = std::env::var("OIDCLITE_CLIENT_SECRET") {
            self.client.client_secret = if secret.is_empty() { None } else { Some(secret) };
        }

        if let Ok(redirect_uri) = std::env::var("OIDCLITE_REDIRECT_URI") {
            self.client.redirect_uri = redirect_uri;
        }

        if let Ok(scopes) = std::env::var("OIDCLITE_SCOPES") {
            let parsed = parse_scope_list(&scopes);
            if parsed.is_empty() {
                tracing::warn!("Ignoring empty OIDCLITE_SCOPES");
            } else {
                self.client.scopes = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("OIDCLITE_HTTP_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.http.timeout_seconds = Some(value);
            } else {
                tracing::warn!("Invalid OIDCLITE_HTTP_TIMEOUT_SECONDS: {}", timeout);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) -> Result<()> {
        if let Some(discovery_url) = &cli.discovery_url {
            self.client.discovery_url = discovery_url.clone();
        }
        if let Some(issuer) = &cli.issuer {
            self.client.discovery_url = well_known_url(issuer)?.to_string();
        }
        if let Some(client_id) = &cli.client_id {
            self.client.client_id = client_id.clone();
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        Ok(())
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.http.validate()
    }
}

/// Splits a comma- or whitespace-separated scope list.
fn parse_scope_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
