//! Authorization URL construction

use url::Url;

use crate::config::ClientConfiguration;
use crate::oidc::params::{Param, RESPONSE_TYPE_CODE};
use crate::oidc::pkce::METHOD_S256;
use crate::oidc::session::AuthorizationSession;

/// An authorization URL together with the session it was built for.
///
/// The browser collaborator opens [`Self::url`]; the caller keeps
/// [`Self::session`] to validate the redirect and exchange the code.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub session: AuthorizationSession,
}

/// Builds the authorization URL for `session` against `endpoint`.
///
/// Parameters appear in this order: `client_id`, `response_type`, `scope`,
/// `redirect_uri`, `state`, `code_challenge_method`, `code_challenge`,
/// `nonce`. Values are percent-encoded, so spaces in the scope list become
/// `%20`. A query already present on the endpoint is kept and extended.
///
/// # Examples
///
/// ```
/// use oidclite::config::ClientConfiguration;
/// use oidclite::oidc::pkce::CodeVerifier;
/// use oidclite::oidc::request::build_authorization_url;
/// use oidclite::oidc::session::AuthorizationSession;
///
/// let config = ClientConfiguration::new("https://idp/.well-known/openid-configuration", "app")
///     .with_scopes(["openid", "email"]);
/// let session = AuthorizationSession::new(CodeVerifier::generate(), &config.redirect_uri);
/// let endpoint = url::Url::parse("https://idp/auth").unwrap();
///
/// let url = build_authorization_url(&endpoint, &config, &session);
/// assert!(url.query().unwrap().contains("scope=openid%20email"));
/// ```
pub fn build_authorization_url(
    endpoint: &Url,
    config: &ClientConfiguration,
    session: &AuthorizationSession,
) -> Url {
    let challenge = session.code_verifier().challenge();
    let scope = config.scope_string();

    let pairs: [(Param, &str); 8] = [
        (Param::ClientId, config.client_id.as_str()),
        (Param::ResponseType, RESPONSE_TYPE_CODE),
        (Param::Scope, scope.as_str()),
        (Param::RedirectUri, session.redirect_uri()),
        (Param::State, session.state()),
        (Param::CodeChallengeMethod, METHOD_S256),
        (Param::CodeChallenge, challenge.as_str()),
        (Param::Nonce, session.nonce()),
    ];

    let encoded = pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name.as_str(), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    let mut url = endpoint.clone();
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
        _ => encoded,
    };
    url.set_query(Some(&query));
    url.set_fragment(None);

    tracing::debug!(
        endpoint = %endpoint,
        scope = %scope,
        "Built authorization URL"
    );
    url
}
