//! Authorization code exchange
//!
//! Posts the code and PKCE verifier to the token endpoint and decodes the
//! provider's answer into a [`TokenResponse`]. Only `200 OK` counts as
//! success; an error body on any other status is logged, never returned.

use std::fmt;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::config::ClientConfiguration;
use crate::error::{OidcError, Result};
use crate::oidc::params::{Param, GRANT_TYPE_AUTHORIZATION_CODE};
use crate::oidc::session::AuthorizationSession;
use crate::transport::describe_status;

// ---------------------------------------------------------------------------
// TokenResponse
// ---------------------------------------------------------------------------

/// Tokens returned by a successful exchange.
///
/// Each field is independently optional; `None` means the provider did not
/// send it. `Debug` never prints token values.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Lifetime of the access token in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Builds a response from a decoded JSON value.
    ///
    /// Fields with the wrong JSON type are treated as absent. `expires_in`
    /// is accepted as a number or a numeric string.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::ResponseDecode`] when `value` is not an object.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| OidcError::ResponseDecode {
            reason: "expected a JSON object".to_string(),
        })?;

        Ok(Self {
            access_token: string_field(object, "access_token"),
            refresh_token: string_field(object, "refresh_token"),
            id_token: string_field(object, "id_token"),
            token_type: string_field(object, "token_type"),
            expires_in: object.get("expires_in").and_then(|v| match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            }),
            scope: string_field(object, "scope"),
        })
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("TokenResponse")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("id_token", &redact(&self.id_token))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// OAuth error body sent with non-success token responses.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// Form fields for the token request, in wire order.
///
/// `client_secret` is present only when configured.
pub(crate) fn token_request_form<'a>(
    config: &'a ClientConfiguration,
    session: &'a AuthorizationSession,
    code: &'a str,
) -> Vec<(&'static str, &'a str)> {
    let mut form = vec![
        (Param::GrantType.as_str(), GRANT_TYPE_AUTHORIZATION_CODE),
        (Param::ClientId.as_str(), config.client_id.as_str()),
    ];
    if let Some(secret) = config.client_secret.as_deref() {
        form.push((Param::ClientSecret.as_str(), secret));
    }
    form.push((Param::RedirectUri.as_str(), session.redirect_uri()));
    form.push((Param::Code.as_str(), code));
    form.push((Param::CodeVerifier.as_str(), session.code_verifier().as_str()));
    form
}

/// Exchanges `code` for tokens at `token_endpoint`.
///
/// Sends an `application/x-www-form-urlencoded` POST carrying
/// `grant_type`, `client_id`, the optional `client_secret`, `redirect_uri`,
/// `code` and `code_verifier`, with `Accept: application/json`.
///
/// # Errors
///
/// - [`OidcError::Transport`] when no response arrives or the body cannot be
///   read
/// - [`OidcError::NonSuccessStatus`] for any status other than `200 OK`
/// - [`OidcError::ResponseDecode`] when a `200 OK` body is not a JSON object
///
/// # Examples
///
/// ```no_run
/// use oidclite::config::ClientConfiguration;
/// use oidclite::oidc::pkce::CodeVerifier;
/// use oidclite::oidc::session::AuthorizationSession;
/// use oidclite::oidc::token::exchange_code;
///
/// # async fn example() -> oidclite::error::Result<()> {
/// let http = reqwest::Client::new();
/// let config = ClientConfiguration::new("https://idp/.well-known/openid-configuration", "app");
/// let session = AuthorizationSession::new(CodeVerifier::generate(), &config.redirect_uri);
/// let endpoint = url::Url::parse("https://idp/token").unwrap();
/// let tokens = exchange_code(&http, &endpoint, &config, &session, "code-from-redirect").await?;
/// println!("{:?}", tokens);
/// # Ok(())
/// # }
/// ```
pub async fn exchange_code(
    http: &reqwest::Client,
    token_endpoint: &Url,
    config: &ClientConfiguration,
    session: &AuthorizationSession,
    code: &str,
) -> Result<TokenResponse> {
    tracing::debug!(
        endpoint = %token_endpoint,
        confidential = config.client_secret.is_some(),
        "Exchanging authorization code"
    );

    let form = token_request_form(config, session, code);
    let response = http
        .post(token_endpoint.clone())
        .header(ACCEPT, "application/json")
        .form(&form)
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        // The error body is for logs only; a failed read must not mask the status.
        let body = response.bytes().await.ok();
        log_provider_error(status, body.as_deref().unwrap_or_default());
        return Err(OidcError::NonSuccessStatus {
            status: status.as_u16(),
            description: describe_status(status),
        });
    }

    let body = response.bytes().await?;

    let value: Value = serde_json::from_slice(&body).map_err(|e| OidcError::ResponseDecode {
        reason: e.to_string(),
    })?;
    let tokens = TokenResponse::from_json(&value)?;

    tracing::info!(
        endpoint = %token_endpoint,
        has_access_token = tokens.access_token.is_some(),
        has_id_token = tokens.id_token.is_some(),
        has_refresh_token = tokens.refresh_token.is_some(),
        "Token exchange succeeded"
    );
    Ok(tokens)
}

fn log_provider_error(status: StatusCode, body: &[u8]) {
    match serde_json::from_slice::<ProviderErrorBody>(body) {
        Ok(err) => tracing::warn!(
            status = status.as_u16(),
            error = err.error.as_deref().unwrap_or("<none>"),
            error_description = err.error_description.as_deref().unwrap_or("<none>"),
            "Token endpoint rejected the exchange"
        ),
        Err(_) => tracing::warn!(
            status = status.as_u16(),
            "Token endpoint rejected the exchange"
        ),
    }
}
