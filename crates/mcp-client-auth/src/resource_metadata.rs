//! # Protected Resource Metadata (RFC 9728)
//!
//! An MCP server publishes which authorization servers it trusts at a single
//! well-known location under its origin:
//!
//! ```text
//! {scheme}://{host[:port]}/.well-known/oauth-protected-resource
//! ```
//!
//! A server may also point at its document explicitly through the
//! `resource_metadata` attribute of a `WWW-Authenticate` challenge; see
//! [`parse_resource_metadata_hint`] and [`ResourceMetadataFetcher::discover_at`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::fetch::{FetcherConfig, JsonFetcher};
use crate::url_policy::validate_secure_url;

/// Well-known path of the protected resource metadata document
pub const PROTECTED_RESOURCE_WELL_KNOWN: &str = "/.well-known/oauth-protected-resource";

/// OAuth 2.0 Protected Resource Metadata (RFC 9728)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtectedResourceMetadata {
    /// Resource identifier, expected to equal the server's base URL
    pub resource: String,

    /// Issuers of the authorization servers this resource trusts, in order
    #[serde(default)]
    pub authorization_servers: Vec<String>,

    /// Scopes the resource understands
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,

    /// Supported bearer token presentation methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_methods_supported: Option<Vec<String>>,

    /// Human-readable documentation for the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,

    /// Additional metadata fields
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

impl ProtectedResourceMetadata {
    /// Check that `resource` is present and at least one authorization server
    /// is listed
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Protocol`] naming the missing field.
    pub fn validate(&self, source: &str) -> AuthResult<()> {
        if self.resource.trim().is_empty() {
            return Err(AuthError::protocol(source, "missing required field resource"));
        }

        if self.authorization_servers.is_empty() {
            return Err(AuthError::protocol(
                source,
                "authorization_servers must list at least one issuer",
            ));
        }

        Ok(())
    }

    /// Compare the advertised `resource` with the URL that was queried
    ///
    /// Trailing slashes are ignored; everything else must match exactly.
    pub fn matches_resource(&self, queried: &str) -> bool {
        self.resource.trim_end_matches('/') == queried.trim_end_matches('/')
    }

    /// First listed authorization server, if any
    pub fn primary_authorization_server(&self) -> Option<&str> {
        self.authorization_servers.first().map(String::as_str)
    }
}

/// Build the well-known metadata URL for a resource server
///
/// The path, query and fragment of `resource` are discarded.
pub fn resource_metadata_url(resource: &Url) -> Url {
    let mut url = resource.clone();
    url.set_path(PROTECTED_RESOURCE_WELL_KNOWN);
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Extract the `resource_metadata` URL from a `WWW-Authenticate` header value
///
/// Accepts both quoted and bare forms:
///
/// ```rust
/// use mcp_client_auth::resource_metadata::parse_resource_metadata_hint;
///
/// let header = r#"Bearer realm="mcp", resource_metadata="https://mcp.example.com/.well-known/oauth-protected-resource""#;
/// assert_eq!(
///     parse_resource_metadata_hint(header).as_deref(),
///     Some("https://mcp.example.com/.well-known/oauth-protected-resource")
/// );
/// assert!(parse_resource_metadata_hint("Bearer realm=\"mcp\"").is_none());
/// ```
pub fn parse_resource_metadata_hint(www_authenticate: &str) -> Option<String> {
    const KEY: &str = "resource_metadata=";

    let (pos, _) = www_authenticate.match_indices(KEY).find(|&(pos, _)| {
        www_authenticate[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || c == ',')
    })?;
    let rest = &www_authenticate[pos + KEY.len()..];

    let value = match rest.strip_prefix('"') {
        Some(quoted) => &quoted[..quoted.find('"')?],
        None => {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == ',')
                .unwrap_or(rest.len());
            &rest[..end]
        }
    };

    (!value.is_empty()).then(|| value.to_string())
}

/// Fetcher for protected resource metadata documents
#[derive(Debug, Clone)]
pub struct ResourceMetadataFetcher {
    fetcher: JsonFetcher,
}

impl ResourceMetadataFetcher {
    /// Create a new fetcher with default configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn new() -> AuthResult<Self> {
        Self::with_config(FetcherConfig::discovery())
    }

    /// Create a new fetcher with custom configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn with_config(config: FetcherConfig) -> AuthResult<Self> {
        Ok(Self {
            fetcher: JsonFetcher::new(config)?,
        })
    }

    /// Discover the metadata of the resource server at `resource_url`
    ///
    /// A mismatch between the advertised `resource` and `resource_url` is
    /// logged but not rejected.
    ///
    /// # Errors
    ///
    /// Malformed or insecure `resource_url`, fetch failures, and documents
    /// without `resource` or `authorization_servers`.
    pub async fn discover(&self, resource_url: &str) -> AuthResult<ProtectedResourceMetadata> {
        let resource = validate_secure_url(resource_url, "resource URL")?;
        let metadata_url = resource_metadata_url(&resource);

        let metadata = self.fetch(&metadata_url).await?;
        if !metadata.matches_resource(resource_url) {
            warn!(
                queried = resource_url,
                advertised = %metadata.resource,
                "Protected resource metadata names a different resource"
            );
        }

        Ok(metadata)
    }

    /// Fetch a protected resource metadata document from an explicit URL
    ///
    /// # Errors
    ///
    /// Same as [`discover`](Self::discover).
    pub async fn discover_at(&self, metadata_url: &str) -> AuthResult<ProtectedResourceMetadata> {
        let url = validate_secure_url(metadata_url, "resource metadata URL")?;
        self.fetch(&url).await
    }

    async fn fetch(&self, url: &Url) -> AuthResult<ProtectedResourceMetadata> {
        debug!(url = %url, "Fetching protected resource metadata");

        let metadata: ProtectedResourceMetadata = self.fetcher.fetch_json(url).await?;
        metadata.validate(url.as_str())?;

        debug!(
            resource = %metadata.resource,
            authorization_servers = metadata.authorization_servers.len(),
            "Discovered protected resource metadata"
        );
        Ok(metadata)
    }
}
