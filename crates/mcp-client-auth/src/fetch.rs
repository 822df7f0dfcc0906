//! # Metadata Fetch Discipline
//!
//! Every well-known document this crate reads (authorization server metadata,
//! protected resource metadata, client ID metadata documents) is fetched the
//! same way:
//!
//! - `GET` with `Accept: application/json` and a fixed `User-Agent`
//! - bounded request timeout (10 seconds by default)
//! - TLS 1.2 minimum, redirects never followed
//! - status must be exactly `200`
//! - `Content-Type` must contain `application/json` (case-insensitive)
//! - body capped; a body that reaches the cap is rejected, never truncated
//!
//! Only the size cap differs between document kinds, see
//! [`FetcherConfig::discovery`] and [`FetcherConfig::client_metadata`].

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{AuthError, AuthResult};

/// Maximum size of discovery documents (1 MiB)
pub const MAX_DISCOVERY_RESPONSE_SIZE: usize = 1024 * 1024;

/// Maximum size of client ID metadata documents (100 KiB)
pub const MAX_CLIENT_METADATA_RESPONSE_SIZE: usize = 100 * 1024;

/// Default timeout for a single metadata request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const JSON_MEDIA_TYPE: &str = "application/json";

/// User agent sent with every metadata request
pub fn user_agent() -> String {
    format!("mcp-client-auth/{}", env!("CARGO_PKG_VERSION"))
}

/// Configuration for metadata fetchers
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Maximum response size in bytes; bodies of this size or larger are rejected
    pub max_response_size: usize,

    /// Request timeout
    pub request_timeout: Duration,

    /// User agent for HTTP requests
    pub user_agent: String,
}

impl FetcherConfig {
    /// Limits for authorization server and protected resource metadata
    pub fn discovery() -> Self {
        Self {
            max_response_size: MAX_DISCOVERY_RESPONSE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: user_agent(),
        }
    }

    /// Limits for client ID metadata documents
    pub fn client_metadata() -> Self {
        Self {
            max_response_size: MAX_CLIENT_METADATA_RESPONSE_SIZE,
            ..Self::discovery()
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::discovery()
    }
}

/// Build the hardened HTTP client used for metadata requests
///
/// # Errors
///
/// Returns [`AuthError::Configuration`] if the TLS backend cannot be initialised.
pub(crate) fn build_client(
    request_timeout: Duration,
    user_agent: &str,
) -> AuthResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .user_agent(user_agent)
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .redirect(reqwest::redirect::Policy::none()) // Don't follow redirects (security)
        .build()
        .map_err(|e| AuthError::configuration(format!("Failed to create HTTP client: {e}")))
}

/// Single-URL JSON fetcher shared by all metadata fetchers
#[derive(Debug, Clone)]
pub struct JsonFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl JsonFetcher {
    /// Create a fetcher with the given limits
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn new(config: FetcherConfig) -> AuthResult<Self> {
        let client = build_client(config.request_timeout, &config.user_agent)?;
        Ok(Self { client, config })
    }

    /// Active configuration
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch `url` and deserialize the body as `T`
    ///
    /// # Errors
    ///
    /// - [`AuthError::Network`] if the request or body read fails
    /// - [`AuthError::Protocol`] for a non-200 status, wrong content type,
    ///   oversized body, or unparseable JSON
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> AuthResult<T> {
        let body = self.fetch_body(url).await?;

        serde_json::from_slice(&body)
            .map_err(|e| AuthError::protocol(url.as_str(), format!("Invalid JSON: {e}")))
    }

    async fn fetch_body(&self, url: &Url) -> AuthResult<Vec<u8>> {
        debug!(url = %url, "Fetching metadata document");

        let mut response = self
            .client
            .get(url.clone())
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| AuthError::network(url.as_str(), e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AuthError::protocol(
                url.as_str(),
                format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !is_json_content_type(content_type) {
            return Err(AuthError::protocol(
                url.as_str(),
                format!("unexpected Content-Type {content_type:?}, expected {JSON_MEDIA_TYPE}"),
            ));
        }

        let max = self.config.max_response_size;

        // Check content length
        if let Some(content_length) = response.content_length()
            && content_length >= max as u64
        {
            return Err(too_large(url, max));
        }

        // Read response body with size limit
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AuthError::network(url.as_str(), format!("Failed to read response: {e}")))?
        {
            body.extend_from_slice(&chunk);
            if body.len() >= max {
                return Err(too_large(url, max));
            }
        }

        Ok(body)
    }
}

fn too_large(url: &Url, max: usize) -> AuthError {
    AuthError::protocol(
        url.as_str(),
        format!("response body reached the {max} byte limit"),
    )
}

/// Case-insensitive substring match on `application/json`
pub(crate) fn is_json_content_type(value: &str) -> bool {
    value.to_ascii_lowercase().contains(JSON_MEDIA_TYPE)
}
