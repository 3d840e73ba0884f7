//! oidclite - OpenID Connect authorization code + PKCE client library
//!
//! Resolves a provider's endpoints from its discovery document, builds
//! CSRF-resistant authorization URLs, and exchanges the returned
//! authorization code for tokens. Opening the browser, storing tokens and
//! validating ID tokens are left to the caller.
//!
//! # Architecture
//!
//! - `oidc`: discovery, PKCE, sessions, URL building, token exchange and the
//!   [`OidcClient`] that ties them together
//! - `config`: configuration loading and validation
//! - `transport`: the shared ephemeral HTTP client
//! - `error`: error types and result aliases
//! - `cli` / `commands`: the `oidclite` command-line driver
//!
//! # Example
//!
//! ```no_run
//! use oidclite::{ClientConfiguration, OidcClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfiguration::new(
//!         "https://idp.example.com/.well-known/openid-configuration",
//!         "my-client",
//!     );
//!     let client = OidcClient::new(config)?;
//!     client.resolve().await?;
//!
//!     if let Some(request) = client.authorization_request() {
//!         println!("Open {} in a browser", request.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod oidc;
pub mod transport;

// Re-export commonly used types
pub use config::{ClientConfiguration, Config};
pub use error::{ErrorKind, OidcError, Result};
pub use oidc::channel::{ExchangeOutcome, ResultChannel};
pub use oidc::client::{ClientState, DiscoveryStatus, OidcClient};
pub use oidc::discovery::DiscoveryDocument;
pub use oidc::request::AuthorizationRequest;
pub use oidc::session::AuthorizationSession;
pub use oidc::token::TokenResponse;
