//! OpenID Connect authorization code flow with PKCE
//!
//! # Module Layout
//!
//! - [`discovery`] -- provider metadata resolution
//! - [`pkce`]      -- `S256` verifier and challenge
//! - [`session`]   -- per-attempt state, nonce and callback validation
//! - [`request`]   -- authorization URL construction
//! - [`token`]     -- authorization code exchange
//! - [`channel`]   -- outcome delivery to the caller
//! - [`client`]    -- [`OidcClient`](client::OidcClient), which ties them together
//! - [`params`]    -- protocol parameter names

pub mod channel;
pub mod client;
pub mod discovery;
pub mod params;
pub mod pkce;
pub mod request;
pub mod session;
pub mod token;
