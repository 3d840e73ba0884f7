//! OIDC client
//!
//! [`OidcClient`] ties the pieces together. It owns the immutable
//! [`ClientConfiguration`], one ephemeral HTTP client, the PKCE verifier
//! generated at construction, and the discovery document once resolved.
//! Each login attempt is described by a caller-owned
//! [`AuthorizationSession`]; the client only remembers the most recently
//! issued `state`.
//!
//! # Example
//!
//! ```no_run
//! use oidclite::config::ClientConfiguration;
//! use oidclite::oidc::client::OidcClient;
//!
//! # async fn example() -> oidclite::error::Result<()> {
//! let config = ClientConfiguration::new(
//!     "https://idp.example.com/.well-known/openid-configuration",
//!     "my-client",
//! );
//! let client = OidcClient::new(config)?;
//! client.resolve().await?;
//!
//! let request = client.try_authorization_request()?;
//! println!("open {}", request.url);
//!
//! // ... the browser returns to oidclite://openID?code=...&state=...
//! # let redirect = String::new();
//! let code = request.session.validate_callback(&redirect)?;
//! let tokens = client.exchange_code(&request.session, &code).await?;
//! # let _ = tokens;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::{ClientConfiguration, Config};
use crate::error::{ErrorKind, OidcError, Result};
use crate::oidc::channel::ResultChannel;
use crate::oidc::discovery::{fetch_discovery_document, DiscoveryDocument};
use crate::oidc::pkce::PkceChallenge;
use crate::oidc::request::{build_authorization_url, AuthorizationRequest};
use crate::oidc::session::AuthorizationSession;
use crate::oidc::token::{self, TokenResponse};
use crate::transport;

/// Lifecycle of a client instance.
///
/// `Initialized` moves to `EndpointsResolved` or `EndpointsUnresolved` on the
/// first resolution attempt. `LoginUrlIssued` may repeat, and
/// `TokenExchangePending` may be re-entered after either terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Initialized,
    EndpointsUnresolved,
    EndpointsResolved,
    LoginUrlIssued,
    TokenExchangePending,
    TokenReceived,
    ExchangeFailed,
}

/// Discovery progress, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStatus {
    /// No resolution has completed yet.
    Unresolved,
    /// The discovery document is cached on the client.
    Resolved,
    /// The last resolution attempt failed; it may be retried.
    Failed(ErrorKind),
}

struct Inner {
    config: ClientConfiguration,
    http: reqwest::Client,
    pkce: PkceChallenge,
    discovery: RwLock<Option<DiscoveryDocument>>,
    resolve_lock: tokio::sync::Mutex<()>,
    discovery_tx: watch::Sender<DiscoveryStatus>,
    state: RwLock<ClientState>,
    last_issued_state: RwLock<Option<String>>,
    channel: RwLock<Option<Arc<dyn ResultChannel>>>,
    pending_exchange: Mutex<Option<JoinHandle<()>>>,
    exchange_generation: AtomicU64,
}

/// OpenID Connect authorization code + PKCE client.
///
/// Cheap to clone; clones share configuration, endpoints and verifier.
#[derive(Clone)]
pub struct OidcClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for OidcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcClient")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .field("discovery", &*self.inner.discovery_tx.borrow())
            .finish()
    }
}

impl OidcClient {
    /// Creates a client with a default ephemeral HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::Config`] if `config` fails validation, or
    /// [`OidcError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfiguration) -> Result<Self> {
        let http = transport::build_client(&Default::default())?;
        Self::with_http_client(config, http)
    }

    /// Creates a client from a loaded [`Config`], honouring its HTTP settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.http.validate()?;
        let http = transport::build_client(&config.http)?;
        Self::with_http_client(config.client.clone(), http)
    }

    /// Creates a client that issues every request through `http`.
    ///
    /// The caller is responsible for `http` carrying no cookie store or
    /// stored credentials.
    pub fn with_http_client(config: ClientConfiguration, http: reqwest::Client) -> Result<Self> {
        config.validate()?;
        let (discovery_tx, _) = watch::channel(DiscoveryStatus::Unresolved);

        tracing::debug!(
            client_id = %config.client_id,
            discovery_url = %config.discovery_url,
            "Created OIDC client"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                pkce: PkceChallenge::generate(),
                discovery: RwLock::new(None),
                resolve_lock: tokio::sync::Mutex::new(()),
                discovery_tx,
                state: RwLock::new(ClientState::Initialized),
                last_issued_state: RwLock::new(None),
                channel: RwLock::new(None),
                pending_exchange: Mutex::new(None),
                exchange_generation: AtomicU64::new(0),
            }),
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfiguration {
        &self.inner.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        *self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// S256 challenge of this instance's verifier; identical for every
    /// authorization URL the instance builds.
    pub fn code_challenge(&self) -> String {
        self.inner.pkce.challenge.clone()
    }

    /// The `state` of the most recently built authorization URL.
    pub fn last_issued_state(&self) -> Option<String> {
        self.inner
            .last_issued_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The cached discovery document, if resolution has succeeded.
    pub fn discovery(&self) -> Option<DiscoveryDocument> {
        self.inner
            .discovery
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribes to discovery progress.
    ///
    /// The receiver starts at the current status; await
    /// [`watch::Receiver::changed`] for the next transition.
    pub fn discovery_status(&self) -> watch::Receiver<DiscoveryStatus> {
        self.inner.discovery_tx.subscribe()
    }

    /// Registers the consumer for operation outcomes, replacing any previous
    /// one.
    pub fn set_result_channel(&self, channel: Arc<dyn ResultChannel>) {
        *self
            .inner
            .channel
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(channel);
    }

    /// Whether a spawned exchange is still running.
    pub fn is_exchange_pending(&self) -> bool {
        self.inner
            .pending_exchange
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Resolves the provider endpoints.
    ///
    /// The document is fetched once and cached for the life of the client;
    /// later calls return the cached copy without network traffic.
    /// Concurrent callers share a single request. A failed attempt leaves
    /// the endpoints unset, publishes [`DiscoveryStatus::Failed`] and can be
    /// retried. Failures are not sent to the result channel.
    ///
    /// # Errors
    ///
    /// Any error from
    /// [`fetch_discovery_document`](crate::oidc::discovery::fetch_discovery_document),
    /// or [`OidcError::InvalidEndpointUrl`] when the configured discovery URL
    /// does not parse.
    pub async fn resolve(&self) -> Result<DiscoveryDocument> {
        if let Some(document) = self.discovery() {
            return Ok(document);
        }

        let _guard = self.inner.resolve_lock.lock().await;
        if let Some(document) = self.discovery() {
            return Ok(document);
        }

        match self.fetch_discovery().await {
            Ok(document) => {
                *self
                    .inner
                    .discovery
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(document.clone());
                self.inner.discovery_tx.send_replace(DiscoveryStatus::Resolved);
                self.advance_after_discovery(ClientState::EndpointsResolved);
                Ok(document)
            }
            Err(e) => {
                tracing::warn!(
                    discovery_url = %self.inner.config.discovery_url,
                    kind = %e.kind(),
                    "Discovery failed: {}",
                    e
                );
                self.inner
                    .discovery_tx
                    .send_replace(DiscoveryStatus::Failed(e.kind()));
                self.advance_after_discovery(ClientState::EndpointsUnresolved);
                Err(e)
            }
        }
    }

    async fn fetch_discovery(&self) -> Result<DiscoveryDocument> {
        let url = self.inner.config.discovery_endpoint()?;
        fetch_discovery_document(&self.inner.http, &url).await
    }

    fn advance_after_discovery(&self, next: ClientState) {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if matches!(
            *state,
            ClientState::Initialized | ClientState::EndpointsUnresolved
        ) {
            *state = next;
        }
    }

    fn set_state(&self, next: ClientState) {
        *self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }

    // -----------------------------------------------------------------------
    // Authorization request
    // -----------------------------------------------------------------------

    /// Builds an authorization URL with a fresh `state` and `nonce`.
    ///
    /// # Errors
    ///
    /// [`OidcError::MissingAuthorizationEndpoint`] when discovery has not
    /// succeeded or did not include the endpoint, and
    /// [`OidcError::InvalidEndpointUrl`] when the endpoint does not parse.
    pub fn try_authorization_request(&self) -> Result<AuthorizationRequest> {
        let endpoint = self
            .discovery()
            .ok_or(OidcError::MissingAuthorizationEndpoint)?
            .authorization_url()?;

        let session = AuthorizationSession::new(
            self.inner.pkce.verifier.clone(),
            self.inner.config.redirect_uri.clone(),
        );
        let url = build_authorization_url(&endpoint, &self.inner.config, &session);

        *self
            .inner
            .last_issued_state
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session.state().to_string());
        {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if *state != ClientState::TokenExchangePending {
                *state = ClientState::LoginUrlIssued;
            }
        }

        tracing::info!(endpoint = %endpoint, "Issued authorization URL");
        Ok(AuthorizationRequest { url, session })
    }

    /// Builds an authorization URL, or returns `None` after reporting the
    /// failure to the result channel.
    pub fn authorization_request(&self) -> Option<AuthorizationRequest> {
        match self.try_authorization_request() {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::warn!(kind = %e.kind(), "Cannot build authorization URL: {}", e);
                self.report(Err(e));
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Token exchange
    // -----------------------------------------------------------------------

    fn token_endpoint(&self) -> Result<Url> {
        self.discovery()
            .ok_or(OidcError::MissingTokenEndpoint)?
            .token_url()
    }

    /// Exchanges `code` for tokens and returns the outcome directly.
    ///
    /// The result channel is not involved.
    ///
    /// # Errors
    ///
    /// [`OidcError::MissingTokenEndpoint`] or
    /// [`OidcError::InvalidEndpointUrl`] before any request is made, otherwise
    /// any error from [`token::exchange_code`].
    pub async fn exchange_code(
        &self,
        session: &AuthorizationSession,
        code: &str,
    ) -> Result<TokenResponse> {
        let endpoint = self.token_endpoint()?;
        let generation = self.begin_exchange();
        let outcome =
            token::exchange_code(&self.inner.http, &endpoint, &self.inner.config, session, code)
                .await;
        self.finish_exchange(generation, &outcome);
        outcome
    }

    /// Starts an exchange on the Tokio runtime and reports its outcome to
    /// the result channel.
    ///
    /// Exactly one report is made per call. When the token endpoint is
    /// missing or invalid the failure is reported before this returns and no
    /// task is spawned and the state is left unchanged. A new exchange
    /// replaces the tracked handle of any earlier one without cancelling it;
    /// the earlier one still reports its outcome but no longer updates
    /// [`Self::state`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn exchange(&self, session: AuthorizationSession, code: impl Into<String>) {
        let endpoint = match self.token_endpoint() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(kind = %e.kind(), "Cannot exchange code: {}", e);
                self.report(Err(e));
                return;
            }
        };

        let generation = self.begin_exchange();
        let code = code.into();
        let client = self.clone();
        let handle = tokio::spawn(async move {
            let outcome = token::exchange_code(
                &client.inner.http,
                &endpoint,
                &client.inner.config,
                &session,
                &code,
            )
            .await;
            client.finish_exchange(generation, &outcome);
            if let Err(e) = &outcome {
                tracing::warn!(kind = %e.kind(), "Token exchange failed: {}", e);
            }
            client.report(outcome);
        });

        let previous = self
            .inner
            .pending_exchange
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if previous.is_some_and(|h| !h.is_finished()) {
            tracing::debug!("Replaced an in-flight token exchange");
        }
    }

    /// Marks a new exchange as the tracked one and returns its generation.
    fn begin_exchange(&self) -> u64 {
        let generation = self.inner.exchange_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_state(ClientState::TokenExchangePending);
        generation
    }

    fn finish_exchange(&self, generation: u64, outcome: &Result<TokenResponse>) {
        let next = if outcome.is_ok() {
            ClientState::TokenReceived
        } else {
            ClientState::ExchangeFailed
        };

        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.inner.exchange_generation.load(Ordering::SeqCst) == generation {
            *state = next;
        } else {
            tracing::debug!(generation, "Superseded exchange finished; state unchanged");
        }
    }

    fn report(&self, outcome: Result<TokenResponse>) {
        let channel = self
            .inner
            .channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match (channel, outcome) {
            (Some(channel), Ok(tokens)) => channel.report_tokens(tokens),
            (Some(channel), Err(e)) => channel.report_failure(e),
            (None, _) => tracing::debug!("No result channel registered; outcome dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oidc::channel::unbounded;
    use crate::oidc::pkce::CodeVerifier;

    fn config() -> ClientConfiguration {
        ClientConfiguration::new(
            "https://idp.example.com/.well-known/openid-configuration",
            "client-123",
        )
    }

    #[test]
    fn test_new_client_starts_initialized() {
        let client = OidcClient::new(config()).unwrap();
        assert_eq!(client.state(), ClientState::Initialized);
        assert!(client.discovery().is_none());
        assert!(client.last_issued_state().is_none());
        assert_eq!(*client.discovery_status().borrow(), DiscoveryStatus::Unresolved);
    }

    #[test]
    fn test_new_client_rejects_invalid_config() {
        let bad = config().with_redirect_uri("https://app.example.com/cb");
        let err = OidcClient::new(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_authorization_request_without_discovery_returns_none() {
        let client = OidcClient::new(config()).unwrap();
        let (sink, mut rx) = unbounded();
        client.set_result_channel(sink);

        assert!(client.authorization_request().is_none());
        let outcome = rx.try_recv().unwrap();
        assert_eq!(
            outcome.unwrap_err().kind(),
            ErrorKind::MissingAuthorizationEndpoint
        );
        assert_eq!(client.state(), ClientState::Initialized);
    }

    #[test]
    fn test_code_challenge_is_stable() {
        let client = OidcClient::new(config()).unwrap();
        assert_eq!(client.code_challenge(), client.code_challenge());
        let other = OidcClient::new(config()).unwrap();
        assert_ne!(client.code_challenge(), other.code_challenge());
    }

    #[tokio::test]
    async fn test_exchange_without_discovery_reports_missing_token_endpoint() {
        let client = OidcClient::new(config()).unwrap();
        let (sink, mut rx) = unbounded();
        client.set_result_channel(sink);

        let session = AuthorizationSession::new(CodeVerifier::generate(), "oidclite://openID");
        client.exchange(session, "code");

        let outcome = rx.try_recv().unwrap();
        assert_eq!(outcome.unwrap_err().kind(), ErrorKind::MissingTokenEndpoint);
        assert_eq!(client.state(), ClientState::Initialized);
        assert!(!client.is_exchange_pending());
    }

    #[tokio::test]
    async fn test_exchange_code_without_discovery_fails_fast() {
        let client = OidcClient::new(config()).unwrap();
        let session = AuthorizationSession::new(CodeVerifier::generate(), "oidclite://openID");
        let err = client.exchange_code(&session, "code").await.unwrap_err();
        assert!(matches!(err, OidcError::MissingTokenEndpoint));
        assert_eq!(client.state(), ClientState::Initialized);
    }

    #[test]
    fn test_with_http_client_rejects_unparseable_discovery_url() {
        let mut cfg = config();
        cfg.discovery_url = "https://".to_string();
        let client = OidcClient::with_http_client(cfg, reqwest::Client::new());
        assert!(client.is_err());
    }
}
