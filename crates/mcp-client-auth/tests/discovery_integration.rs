//! Integration tests for authorization server and protected resource discovery
//!
//! Tests cover:
//! - RFC 8414 candidate ordering with OpenID Connect fallback
//! - Fetch discipline (status, content type, size cap)
//! - RFC 9728 protected resource metadata discovery
//!
//! # Standards Tested
//! - RFC 8414: OAuth 2.0 Authorization Server Metadata
//! - RFC 9728: OAuth 2.0 Protected Resource Metadata

mod common;

use common::MockAuthServer;
use mcp_client_auth::error::{AuthError, ErrorKind};
use mcp_client_auth::fetch::{FetcherConfig, JsonFetcher, MAX_DISCOVERY_RESPONSE_SIZE};
use mcp_client_auth::resource_metadata::{
    ResourceMetadataFetcher, parse_resource_metadata_hint,
};
use mcp_client_auth::DiscoveryFetcher;
use serde_json::json;
use url::Url;
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{header, method, path},
};

#[tokio::test]
async fn test_path_issuer_falls_back_to_openid_configuration() {
    // GIVEN: A tenant issuer with only an OpenID Connect document
    let mock = MockAuthServer::start().await;
    let issuer = format!("{}/tenant1", mock.uri());

    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server/tenant1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock.server)
        .await;
    mock.mount_json(
        "/.well-known/openid-configuration/tenant1",
        mock.as_metadata("/tenant1"),
    )
    .await;

    // WHEN: We discover the issuer
    let metadata = DiscoveryFetcher::new()
        .unwrap()
        .discover(&issuer)
        .await
        .unwrap();

    // THEN: The second candidate wins
    assert_eq!(metadata.issuer, issuer);
    assert_eq!(metadata.token_endpoint, format!("{}/token", mock.uri()));
    assert!(metadata.supports_pkce());
}

#[tokio::test]
async fn test_first_candidate_wins_without_further_requests() {
    let mock = MockAuthServer::start().await;
    mock.mount_as_metadata(mock.as_metadata("")).await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock.as_metadata("")))
        .expect(0)
        .mount(&mock.server)
        .await;

    let metadata = DiscoveryFetcher::new()
        .unwrap()
        .discover(&mock.uri())
        .await
        .unwrap();
    assert_eq!(
        metadata.authorization_endpoint,
        format!("{}/authorize", mock.uri())
    );
}

#[tokio::test]
async fn test_discovery_sends_json_accept_header() {
    let mock = MockAuthServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock.as_metadata("")))
        .expect(1)
        .mount(&mock.server)
        .await;

    assert!(DiscoveryFetcher::new().unwrap().discover(&mock.uri()).await.is_ok());
}

#[tokio::test]
async fn test_all_candidates_failing_wraps_last_error() {
    // GIVEN: A server with no metadata anywhere
    let mock = MockAuthServer::start().await;

    // WHEN: We discover
    let err = DiscoveryFetcher::new()
        .unwrap()
        .discover(&format!("{}/tenant1", mock.uri()))
        .await
        .unwrap_err();

    // THEN: The error wraps the last candidate's 404
    assert!(matches!(err, AuthError::NoMetadataFound { .. }));
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert!(
        err.to_string()
            .contains("/tenant1/.well-known/openid-configuration"),
        "unexpected error: {err}"
    );
    assert_eq!(mock.server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_invalid_document_moves_to_next_candidate() {
    let mock = MockAuthServer::start().await;
    let mut insecure = mock.as_metadata("");
    insecure["token_endpoint"] = json!("http://auth.example.com/token");
    mock.mount_as_metadata(insecure).await;
    mock.mount_json("/.well-known/openid-configuration", mock.as_metadata(""))
        .await;

    let metadata = DiscoveryFetcher::new()
        .unwrap()
        .discover(&mock.uri())
        .await
        .unwrap();
    assert_eq!(metadata.token_endpoint, format!("{}/token", mock.uri()));
}

#[tokio::test]
async fn test_insecure_issuer_makes_no_request() {
    let err = DiscoveryFetcher::new()
        .unwrap()
        .discover("http://auth.example.com")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemeViolation);
}

#[tokio::test]
async fn test_body_at_size_cap_rejected() {
    // GIVEN: A JSON body exactly at the 1 MiB cap
    let mock = MockAuthServer::start().await;
    let mut body = vec![b' '; MAX_DISCOVERY_RESPONSE_SIZE];
    body[0] = b'{';
    body[MAX_DISCOVERY_RESPONSE_SIZE - 1] = b'}';
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&mock.server)
        .await;

    // WHEN: We fetch it
    let url = Url::parse(&format!("{}/big", mock.uri())).unwrap();
    let err = JsonFetcher::new(FetcherConfig::discovery())
        .unwrap()
        .fetch_json::<serde_json::Value>(&url)
        .await
        .unwrap_err();

    // THEN: It is rejected rather than truncated
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert!(err.to_string().contains("byte limit"));
}

#[tokio::test]
async fn test_body_below_size_cap_accepted() {
    let mock = MockAuthServer::start().await;
    let mut body = vec![b' '; MAX_DISCOVERY_RESPONSE_SIZE - 1];
    body[0] = b'{';
    body[MAX_DISCOVERY_RESPONSE_SIZE - 2] = b'}';
    Mock::given(method("GET"))
        .and(path("/almost"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&mock.server)
        .await;

    let url = Url::parse(&format!("{}/almost", mock.uri())).unwrap();
    let value = JsonFetcher::new(FetcherConfig::discovery())
        .unwrap()
        .fetch_json::<serde_json::Value>(&url)
        .await
        .unwrap();
    assert_eq!(value, json!({}));
}

#[tokio::test]
async fn test_content_type_must_be_json() {
    let mock = MockAuthServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "text/html"))
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/charset"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("{}", "Application/JSON; charset=utf-8"),
        )
        .mount(&mock.server)
        .await;

    let fetcher = JsonFetcher::new(FetcherConfig::discovery()).unwrap();

    let html = Url::parse(&format!("{}/html", mock.uri())).unwrap();
    let err = fetcher
        .fetch_json::<serde_json::Value>(&html)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Content-Type"));

    let charset = Url::parse(&format!("{}/charset", mock.uri())).unwrap();
    assert!(fetcher.fetch_json::<serde_json::Value>(&charset).await.is_ok());
}

#[tokio::test]
async fn test_only_status_200_accepted() {
    let mock = MockAuthServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accepted"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({})))
        .mount(&mock.server)
        .await;

    let url = Url::parse(&format!("{}/accepted", mock.uri())).unwrap();
    let err = JsonFetcher::new(FetcherConfig::discovery())
        .unwrap()
        .fetch_json::<serde_json::Value>(&url)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 202"));
}

#[tokio::test]
async fn test_resource_metadata_discovery() {
    // GIVEN: An MCP server publishing protected resource metadata
    let mock = MockAuthServer::start().await;
    mock.mount_resource_metadata(&["mcp:tools"]).await;

    // WHEN: We discover it from the MCP endpoint URL
    let metadata = ResourceMetadataFetcher::new()
        .unwrap()
        .discover(&mock.mcp_url())
        .await
        .unwrap();

    // THEN: The authorization server and scopes are available
    assert_eq!(metadata.primary_authorization_server(), Some(mock.uri().as_str()));
    assert_eq!(metadata.scopes_supported, vec!["mcp:tools"]);
    assert!(metadata.matches_resource(&mock.mcp_url()));
}

#[tokio::test]
async fn test_resource_metadata_mismatch_is_not_fatal() {
    let mock = MockAuthServer::start().await;
    mock.mount_json(
        "/.well-known/oauth-protected-resource",
        json!({
            "resource": "https://other.example.com/mcp",
            "authorization_servers": [mock.uri()],
        }),
    )
    .await;

    let metadata = ResourceMetadataFetcher::new()
        .unwrap()
        .discover(&mock.mcp_url())
        .await
        .unwrap();
    assert!(!metadata.matches_resource(&mock.mcp_url()));
}

#[tokio::test]
async fn test_resource_metadata_without_servers_rejected() {
    let mock = MockAuthServer::start().await;
    mock.mount_json(
        "/.well-known/oauth-protected-resource",
        json!({ "resource": mock.mcp_url(), "authorization_servers": [] }),
    )
    .await;

    let err = ResourceMetadataFetcher::new()
        .unwrap()
        .discover(&mock.mcp_url())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
}

#[tokio::test]
async fn test_resource_metadata_from_www_authenticate_hint() {
    let mock = MockAuthServer::start().await;
    mock.mount_json(
        "/meta/prm.json",
        json!({
            "resource": mock.mcp_url(),
            "authorization_servers": [mock.uri()],
        }),
    )
    .await;

    let challenge = format!(
        r#"Bearer error="invalid_token", resource_metadata="{}/meta/prm.json""#,
        mock.uri()
    );
    let hint = parse_resource_metadata_hint(&challenge).unwrap();

    let metadata = ResourceMetadataFetcher::new()
        .unwrap()
        .discover_at(&hint)
        .await
        .unwrap();
    assert_eq!(metadata.resource, mock.mcp_url());
}
