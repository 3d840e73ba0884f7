use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oidclite::{ClientConfiguration, OidcClient};

pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn discovery_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), DISCOVERY_PATH)
}

/// Discovery body whose endpoints live on `server`.
#[allow(dead_code)]
pub fn discovery_body(server: &MockServer) -> serde_json::Value {
    serde_json::json!({
        "issuer": server.uri(),
        "authorization_endpoint": format!("{}/authorize", server.uri()),
        "token_endpoint": format!("{}/token", server.uri()),
        "code_challenge_methods_supported": ["S256"]
    })
}

/// Serves `body` as the discovery document.
#[allow(dead_code)]
pub async fn mount_discovery(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(DISCOVERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub fn client_config(server: &MockServer) -> ClientConfiguration {
    ClientConfiguration::new(discovery_url(server), "test-client")
}

/// A client whose discovery document, served by `server`, is already
/// resolved.
#[allow(dead_code)]
pub async fn resolved_client(server: &MockServer) -> OidcClient {
    mount_discovery(server, discovery_body(server)).await;
    let client = OidcClient::new(client_config(server)).expect("valid client config");
    client.resolve().await.expect("discovery must succeed");
    client
}

/// A loopback URL nothing is listening on.
#[allow(dead_code)]
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
