//! OpenID Connect discovery
//!
//! Fetches the provider's metadata document and extracts the endpoints the
//! authorization code flow needs. Parsing is lenient: a field that is missing
//! or has the wrong JSON type is left unset instead of failing resolution.
//!
//! # References
//!
//! - OpenID Connect Discovery 1.0
//!   <https://openid.net/specs/openid-connect-discovery-1_0.html>

use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{OidcError, Result};
use crate::oidc::pkce::METHOD_S256;
use crate::transport::describe_status;

const WELL_KNOWN_SUFFIX: &str = "/.well-known/openid-configuration";

// ---------------------------------------------------------------------------
// DiscoveryDocument
// ---------------------------------------------------------------------------

/// Provider metadata relevant to the authorization code flow.
///
/// Every field is optional; the endpoints are validated as URLs only when
/// they are used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// `authorization_endpoint`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    /// `token_endpoint`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    /// `issuer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// `userinfo_endpoint`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// `jwks_uri`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// `end_session_endpoint`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,

    /// `scopes_supported`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// `code_challenge_methods_supported`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,
}

impl DiscoveryDocument {
    /// Builds a document from a decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::DiscoveryParse`] when `value` is not a JSON
    /// object. Individual fields never cause an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use oidclite::oidc::discovery::DiscoveryDocument;
    ///
    /// let value = serde_json::json!({
    ///     "authorization_endpoint": "https://idp/auth",
    ///     "token_endpoint": 42
    /// });
    /// let doc = DiscoveryDocument::from_json(&value).unwrap();
    /// assert_eq!(doc.authorization_endpoint.as_deref(), Some("https://idp/auth"));
    /// assert!(doc.token_endpoint.is_none());
    /// ```
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| OidcError::DiscoveryParse {
            reason: "expected a JSON object".to_string(),
        })?;

        Ok(Self {
            authorization_endpoint: string_field(object, "authorization_endpoint"),
            token_endpoint: string_field(object, "token_endpoint"),
            issuer: string_field(object, "issuer"),
            userinfo_endpoint: string_field(object, "userinfo_endpoint"),
            jwks_uri: string_field(object, "jwks_uri"),
            end_session_endpoint: string_field(object, "end_session_endpoint"),
            scopes_supported: string_list_field(object, "scopes_supported"),
            code_challenge_methods_supported: string_list_field(
                object,
                "code_challenge_methods_supported",
            ),
        })
    }

    /// Parses a response body.
    ///
    /// # Errors
    ///
    /// Returns [`OidcError::DiscoveryParse`] when the body is not JSON or not
    /// a JSON object.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|e| OidcError::DiscoveryParse {
            reason: e.to_string(),
        })?;
        Self::from_json(&value)
    }

    /// The authorization endpoint as a URL.
    ///
    /// # Errors
    ///
    /// [`OidcError::MissingAuthorizationEndpoint`] when unset or empty,
    /// [`OidcError::InvalidEndpointUrl`] when it does not parse.
    pub fn authorization_url(&self) -> Result<Url> {
        endpoint_url(
            self.authorization_endpoint.as_deref(),
            OidcError::MissingAuthorizationEndpoint,
        )
    }

    /// The token endpoint as a URL.
    ///
    /// # Errors
    ///
    /// [`OidcError::MissingTokenEndpoint`] when unset or empty,
    /// [`OidcError::InvalidEndpointUrl`] when it does not parse.
    pub fn token_url(&self) -> Result<Url> {
        endpoint_url(
            self.token_endpoint.as_deref(),
            OidcError::MissingTokenEndpoint,
        )
    }

    /// Whether the provider advertises the `S256` challenge method.
    ///
    /// Advisory only. Providers that omit the field are still used with S256.
    pub fn supports_s256(&self) -> bool {
        self.code_challenge_methods_supported
            .as_ref()
            .map(|methods| methods.iter().any(|m| m == METHOD_S256))
            .unwrap_or(false)
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn string_list_field(object: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    object.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn endpoint_url(raw: Option<&str>, missing: OidcError) -> Result<Url> {
    match raw {
        Some(raw) if !raw.is_empty() => {
            Url::parse(raw).map_err(|e| OidcError::invalid_endpoint(raw, e))
        }
        _ => Err(missing),
    }
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Derives `{issuer}/.well-known/openid-configuration` for an issuer URL.
///
/// A trailing slash on the issuer is dropped first; query and fragment are
/// cleared.
///
/// # Errors
///
/// Returns [`OidcError::InvalidEndpointUrl`] when `issuer` does not parse.
///
/// # Examples
///
/// ```
/// use oidclite::oidc::discovery::well_known_url;
///
/// let url = well_known_url("https://idp.example.com/realms/dev/").unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://idp.example.com/realms/dev/.well-known/openid-configuration"
/// );
/// ```
pub fn well_known_url(issuer: &str) -> Result<Url> {
    let mut url = Url::parse(issuer).map_err(|e| OidcError::invalid_endpoint(issuer, e))?;
    let path = format!("{}{}", url.path().trim_end_matches('/'), WELL_KNOWN_SUFFIX);
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Fetches and parses the discovery document at `discovery_url`.
///
/// Sends `Accept: application/json` and `Cache-Control: no-cache`.
///
/// # Errors
///
/// - [`OidcError::Transport`] when no response arrives
/// - [`OidcError::NonSuccessStatus`] for any status other than `200 OK`
/// - [`OidcError::DiscoveryParse`] when the body is not a JSON object
///
/// # Examples
///
/// ```no_run
/// use url::Url;
/// use oidclite::oidc::discovery::fetch_discovery_document;
///
/// # async fn example() -> oidclite::error::Result<()> {
/// let http = reqwest::Client::new();
/// let url = Url::parse("https://idp.example.com/.well-known/openid-configuration").unwrap();
/// let doc = fetch_discovery_document(&http, &url).await?;
/// println!("token endpoint: {:?}", doc.token_endpoint);
/// # Ok(())
/// # }
/// ```
pub async fn fetch_discovery_document(
    http: &reqwest::Client,
    discovery_url: &Url,
) -> Result<DiscoveryDocument> {
    tracing::debug!(url = %discovery_url, "Fetching discovery document");

    let response = http
        .get(discovery_url.clone())
        .header(ACCEPT, "application/json")
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(OidcError::NonSuccessStatus {
            status: status.as_u16(),
            description: describe_status(status),
        });
    }

    let body = response.bytes().await?;
    let document = DiscoveryDocument::from_slice(&body)?;

    tracing::info!(
        url = %discovery_url,
        has_authorization_endpoint = document.authorization_endpoint.is_some(),
        has_token_endpoint = document.token_endpoint.is_some(),
        "Resolved discovery document"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_extracts_endpoints() {
        let doc = DiscoveryDocument::from_json(&json!({
            "issuer": "https://idp",
            "authorization_endpoint": "https://idp/auth",
            "token_endpoint": "https://idp/token",
            "code_challenge_methods_supported": ["plain", "S256"]
        }))
        .unwrap();

        assert_eq!(doc.authorization_url().unwrap().as_str(), "https://idp/auth");
        assert_eq!(doc.token_url().unwrap().as_str(), "https://idp/token");
        assert_eq!(doc.issuer.as_deref(), Some("https://idp"));
        assert!(doc.supports_s256());
    }

    #[test]
    fn test_from_json_missing_fields_are_unset() {
        let doc = DiscoveryDocument::from_json(&json!({ "issuer": "https://idp" })).unwrap();
        assert!(doc.authorization_endpoint.is_none());
        assert!(matches!(
            doc.token_url(),
            Err(OidcError::MissingTokenEndpoint)
        ));
        assert!(matches!(
            doc.authorization_url(),
            Err(OidcError::MissingAuthorizationEndpoint)
        ));
    }

    #[test]
    fn test_from_json_wrong_types_are_unset() {
        let doc = DiscoveryDocument::from_json(&json!({
            "authorization_endpoint": ["https://idp/auth"],
            "scopes_supported": "openid"
        }))
        .unwrap();
        assert!(doc.authorization_endpoint.is_none());
        assert!(doc.scopes_supported.is_none());
        assert!(!doc.supports_s256());
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = DiscoveryDocument::from_json(&json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, OidcError::DiscoveryParse { .. }));
    }

    #[test]
    fn test_from_slice_rejects_non_json() {
        let err = DiscoveryDocument::from_slice(b"<html></html>").unwrap_err();
        assert!(matches!(err, OidcError::DiscoveryParse { .. }));
    }

    #[test]
    fn test_invalid_endpoint_url() {
        let doc = DiscoveryDocument {
            token_endpoint: Some("not a url".to_string()),
            ..DiscoveryDocument::default()
        };
        assert!(matches!(
            doc.token_url(),
            Err(OidcError::InvalidEndpointUrl { .. })
        ));
    }

    #[test]
    fn test_empty_endpoint_is_missing() {
        let doc = DiscoveryDocument {
            authorization_endpoint: Some(String::new()),
            ..DiscoveryDocument::default()
        };
        assert!(matches!(
            doc.authorization_url(),
            Err(OidcError::MissingAuthorizationEndpoint)
        ));
    }

    #[test]
    fn test_well_known_url_root_issuer() {
        let url = well_known_url("https://idp.example.com").unwrap();
        assert_eq!(
            url.as_str(),
            "https://idp.example.com/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_well_known_url_rejects_garbage() {
        assert!(well_known_url("idp.example.com").is_err());
    }
}
