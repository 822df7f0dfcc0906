//! Common test utilities for integration tests
//!
//! A single wiremock server plays both the MCP resource server and its
//! authorization server. Wiremock listens on `127.0.0.1`, so plain HTTP is
//! accepted by the loopback exception.

#![allow(dead_code)]

use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Mock MCP server plus authorization server
pub struct MockAuthServer {
    pub server: MockServer,
}

impl MockAuthServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URI, e.g. `http://127.0.0.1:54321`
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// URL of the MCP endpoint
    pub fn mcp_url(&self) -> String {
        format!("{}/mcp", self.uri())
    }

    /// Authorization server metadata for an issuer at `issuer_path`
    pub fn as_metadata(&self, issuer_path: &str) -> Value {
        let base = self.uri();
        json!({
            "issuer": format!("{base}{issuer_path}"),
            "authorization_endpoint": format!("{base}/authorize"),
            "token_endpoint": format!("{base}/token"),
            "registration_endpoint": format!("{base}/register"),
            "response_types_supported": ["code"],
            "code_challenge_methods_supported": ["S256"],
            "scopes_supported": ["mcp:read", "mcp:write"],
        })
    }

    /// Serve `body` as JSON at `at`
    pub async fn mount_json(&self, at: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Serve authorization server metadata at the RFC 8414 location for the
    /// root issuer
    pub async fn mount_as_metadata(&self, metadata: Value) {
        self.mount_json("/.well-known/oauth-authorization-server", metadata)
            .await;
    }

    /// Serve protected resource metadata naming this server as the
    /// authorization server
    pub async fn mount_resource_metadata(&self, scopes: &[&str]) {
        let body = json!({
            "resource": self.mcp_url(),
            "authorization_servers": [self.uri()],
            "scopes_supported": scopes,
            "bearer_methods_supported": ["header"],
        });
        self.mount_json("/.well-known/oauth-protected-resource", body)
            .await;
    }

    /// Accept dynamic client registrations, issuing `client_id`
    pub async fn mount_registration(&self, client_id: &str) {
        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "client_id": client_id,
                "client_id_issued_at": 1_700_000_000u64,
                "redirect_uris": ["http://127.0.0.1:8085/callback"],
                "token_endpoint_auth_method": "none",
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}
