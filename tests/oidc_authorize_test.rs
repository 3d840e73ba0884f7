//! Authorization URL integration tests
//!
//! Drives discovery through wiremock and checks the URLs an `OidcClient`
//! builds: endpoint, parameter encoding, the stable PKCE challenge and fresh
//! anti-replay values on every call.

use std::collections::HashMap;

use url::Url;
use wiremock::MockServer;

use oidclite::oidc::channel;
use oidclite::oidc::pkce::code_challenge;
use oidclite::{ClientState, ErrorKind, OidcClient};

mod common;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn query_map(url: &Url) -> HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

async fn client_with_endpoints(
    server: &MockServer,
    authorization_endpoint: &str,
    scopes: &[&str],
) -> OidcClient {
    common::mount_discovery(
        server,
        serde_json::json!({
            "authorization_endpoint": authorization_endpoint,
            "token_endpoint": format!("{}/token", server.uri())
        }),
    )
    .await;
    let config = common::client_config(server).with_scopes(scopes.iter().copied());
    let client = OidcClient::new(config).unwrap();
    client.resolve().await.unwrap();
    client
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_url_targets_discovered_authorization_endpoint() {
    let server = MockServer::start().await;
    let client = client_with_endpoints(&server, "https://idp/auth", &["openid"]).await;

    let request = client.authorization_request().expect("URL must be built");
    assert_eq!(request.url.scheme(), "https");
    assert_eq!(request.url.host_str(), Some("idp"));
    assert_eq!(request.url.path(), "/auth");

    let params = query_map(&request.url);
    assert_eq!(params["client_id"], "test-client");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["redirect_uri"], "oidclite://openID");
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["state"], request.session.state());
    assert_eq!(params["nonce"], request.session.nonce());
    assert_eq!(client.state(), ClientState::LoginUrlIssued);
}

#[tokio::test]
async fn test_repeated_requests_share_challenge_but_not_state_or_nonce() {
    let server = MockServer::start().await;
    let client = client_with_endpoints(&server, "https://idp/auth", &["openid"]).await;

    let first = client.authorization_request().unwrap();
    let second = client.authorization_request().unwrap();
    let (p1, p2) = (query_map(&first.url), query_map(&second.url));

    assert_eq!(p1["code_challenge"], p2["code_challenge"]);
    assert_eq!(p1["code_challenge"], client.code_challenge());
    assert_eq!(
        p1["code_challenge"],
        code_challenge(first.session.code_verifier().as_str())
    );
    assert_ne!(p1["state"], p2["state"]);
    assert_ne!(p1["nonce"], p2["nonce"]);

    assert_eq!(
        client.last_issued_state().as_deref(),
        Some(second.session.state())
    );
    assert_eq!(client.state(), ClientState::LoginUrlIssued);
}

#[tokio::test]
async fn test_scopes_are_space_joined_and_percent_encoded() {
    let server = MockServer::start().await;
    let client = client_with_endpoints(&server, "https://idp/auth", &["openid", "email"]).await;

    let request = client.authorization_request().unwrap();
    let query = request.url.query().unwrap();
    assert!(
        query.contains("scope=openid%20email"),
        "unexpected query: {query}"
    );
    assert_eq!(query_map(&request.url)["scope"], "openid email");
}

#[tokio::test]
async fn test_default_scopes_are_requested() {
    let server = MockServer::start().await;
    let client = common::resolved_client(&server).await;

    let request = client.authorization_request().unwrap();
    assert_eq!(
        query_map(&request.url)["scope"],
        "openid profile email offline_access"
    );
}

#[tokio::test]
async fn test_no_url_before_discovery() {
    let server = MockServer::start().await;
    let client = OidcClient::new(common::client_config(&server)).unwrap();
    let (sink, mut outcomes) = channel::unbounded();
    client.set_result_channel(sink);

    assert!(client.authorization_request().is_none());
    assert!(client.last_issued_state().is_none());
    assert_eq!(
        outcomes.try_recv().unwrap().unwrap_err().kind(),
        ErrorKind::MissingAuthorizationEndpoint
    );
}

#[tokio::test]
async fn test_invalid_authorization_endpoint_is_reported() {
    let server = MockServer::start().await;
    let client = client_with_endpoints(&server, "not a url", &["openid"]).await;
    let (sink, mut outcomes) = channel::unbounded();
    client.set_result_channel(sink);

    assert!(client.authorization_request().is_none());
    assert_eq!(
        outcomes.try_recv().unwrap().unwrap_err().kind(),
        ErrorKind::InvalidEndpointUrl
    );
    assert_eq!(client.state(), ClientState::EndpointsResolved);
}

#[tokio::test]
async fn test_session_validates_its_own_callback() {
    let server = MockServer::start().await;
    let client = common::resolved_client(&server).await;

    let first = client.authorization_request().unwrap();
    let second = client.authorization_request().unwrap();

    let callback = format!("oidclite://openID?code=abc&state={}", first.session.state());
    assert_eq!(first.session.validate_callback(&callback).unwrap(), "abc");
    assert_eq!(
        second.session.validate_callback(&callback).unwrap_err().kind(),
        ErrorKind::StateMismatch
    );
}
