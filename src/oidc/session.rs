//! Per-attempt authorization session
//!
//! An [`AuthorizationSession`] is the caller-owned record of one login
//! attempt: the fresh `state` and `nonce` placed on the authorization URL, the
//! PKCE verifier whose challenge was sent, and the redirect URI. It is
//! serializable so the authorize and exchange steps can run in different
//! processes.

use std::collections::HashMap;
use std::fmt;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OidcError, Result};
use crate::oidc::params::Param;
use crate::oidc::pkce::CodeVerifier;

/// Number of random bytes behind each `state` and `nonce` value.
const RANDOM_VALUE_BYTES: usize = 32;

/// State for a single authorization attempt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSession {
    state: String,
    nonce: String,
    code_verifier: CodeVerifier,
    redirect_uri: String,
}

impl AuthorizationSession {
    /// Creates a session with freshly generated `state` and `nonce`.
    pub fn new(code_verifier: CodeVerifier, redirect_uri: impl Into<String>) -> Self {
        Self {
            state: generate_state(),
            nonce: generate_nonce(),
            code_verifier,
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Anti-CSRF value sent as `state`.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Replay-protection value sent as `nonce`.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// PKCE verifier sent as `code_verifier` at exchange time.
    pub fn code_verifier(&self) -> &CodeVerifier {
        &self.code_verifier
    }

    /// Redirect URI used on both the authorization URL and the token request.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Validates the redirect the browser received and returns the
    /// authorization code.
    ///
    /// Parameters are read from the query string, or from the fragment when
    /// the query carries neither `code` nor `error`.
    ///
    /// # Errors
    ///
    /// - [`OidcError::InvalidCallback`] if `redirect_url` does not parse or
    ///   carries no `code`
    /// - [`OidcError::StateMismatch`] if `state` is absent or differs from
    ///   [`Self::state`]; checked before anything else
    /// - [`OidcError::AuthorizationDenied`] if the provider returned `error`
    ///
    /// # Examples
    ///
    /// ```
    /// use oidclite::oidc::pkce::CodeVerifier;
    /// use oidclite::oidc::session::AuthorizationSession;
    ///
    /// let session = AuthorizationSession::new(CodeVerifier::generate(), "oidclite://openID");
    /// let callback = format!("oidclite://openID?code=abc&state={}", session.state());
    /// assert_eq!(session.validate_callback(&callback).unwrap(), "abc");
    /// ```
    pub fn validate_callback(&self, redirect_url: &str) -> Result<String> {
        let url = Url::parse(redirect_url)
            .map_err(|e| OidcError::InvalidCallback(format!("unparseable redirect URL: {e}")))?;

        let mut params = collect_pairs(url.query_pairs());
        if !params.contains_key(Param::Code.as_str()) && !params.contains_key(Param::Error.as_str())
        {
            if let Some(fragment) = url.fragment() {
                params = collect_pairs(url::form_urlencoded::parse(fragment.as_bytes()));
            }
        }

        match params.get(Param::State.as_str()) {
            Some(state) if *state == self.state => {}
            _ => {
                tracing::warn!("Authorization callback state does not match the issued state");
                return Err(OidcError::StateMismatch);
            }
        }

        if let Some(error) = params.get(Param::Error.as_str()) {
            return Err(OidcError::AuthorizationDenied {
                error: error.clone(),
                description: params.get(Param::ErrorDescription.as_str()).cloned(),
            });
        }

        params
            .remove(Param::Code.as_str())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                OidcError::InvalidCallback("authorization code missing from callback".to_string())
            })
    }
}

impl fmt::Debug for AuthorizationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationSession")
            .field("state", &"<redacted>")
            .field("nonce", &"<redacted>")
            .field("code_verifier", &self.code_verifier)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

fn collect_pairs<'a>(
    pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
) -> HashMap<String, String> {
    pairs
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn random_value() -> String {
    use rand::RngCore as _;
    let mut bytes = [0u8; RANDOM_VALUE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Generates a random `state` value (32 bytes, base64url without padding).
pub fn generate_state() -> String {
    random_value()
}

/// Generates a random `nonce` value (32 bytes, base64url without padding).
pub fn generate_nonce() -> String {
    random_value()
}
