//! # Client ID Metadata Document Types
//!
//! Types and validation for OAuth Client ID Metadata Documents
//! (draft-ietf-oauth-client-id-metadata-document), as used by MCP clients
//! that have no pre-registered client ID.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::config::OAuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::url_policy::validate_secure_url;

/// Client metadata document
///
/// ## Required Fields
///
/// - `client_id`: HTTPS URL equal to the location the document is served from
/// - `redirect_uris`: at least one absolute URL, HTTPS or loopback HTTP
///
/// ## Example
///
/// ```json
/// {
///   "client_id": "https://app.example.com/oauth/client-metadata.json",
///   "client_name": "Example MCP Client",
///   "redirect_uris": ["http://127.0.0.1:3000/callback"],
///   "grant_types": ["authorization_code"],
///   "response_types": ["code"],
///   "token_endpoint_auth_method": "none"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMetadataDocument {
    /// Client identifier, the URL of this document
    pub client_id: String,

    /// Human-readable client name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    /// URL of the client's home page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_uri: Option<String>,

    /// URL of the client's logo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,

    /// Array of redirect URIs
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Grant types (default: `["authorization_code"]`)
    #[serde(default = "default_grant_types")]
    pub grant_types: Vec<String>,

    /// Response types (default: `["code"]`)
    #[serde(default = "default_response_types")]
    pub response_types: Vec<String>,

    /// Token endpoint authentication method (default: `"none"`)
    #[serde(default = "default_token_endpoint_auth_method")]
    pub token_endpoint_auth_method: String,

    /// Scope values (space-separated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Identifier of the client software
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_id: Option<String>,

    /// Version of the client software
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,

    /// Additional metadata fields
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

fn default_grant_types() -> Vec<String> {
    vec!["authorization_code".to_string()]
}

fn default_response_types() -> Vec<String> {
    vec!["code".to_string()]
}

fn default_token_endpoint_auth_method() -> String {
    "none".to_string()
}

impl ClientMetadataDocument {
    /// Create a public-client document with the default grant, response type
    /// and authentication method
    pub fn new(client_id: impl Into<String>, redirect_uris: Vec<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: None,
            client_uri: None,
            logo_uri: None,
            redirect_uris,
            grant_types: default_grant_types(),
            response_types: default_response_types(),
            token_endpoint_auth_method: default_token_endpoint_auth_method(),
            scope: None,
            software_id: None,
            software_version: None,
            additional_fields: HashMap::new(),
        }
    }

    /// Check if this is a public client (no authentication method)
    pub fn is_public_client(&self) -> bool {
        self.token_endpoint_auth_method == "none"
    }

    /// Check if a redirect URI is listed in this document
    pub fn allows_redirect_uri(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }

    /// Serialize for hosting
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if serialization fails.
    pub fn to_json(&self) -> AuthResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            AuthError::configuration(format!("Failed to serialize client metadata: {e}"))
        })
    }
}

/// Validate a URL for use as a client ID
///
/// The URL must be absolute, use `https` (no loopback exception, since the
/// authorization server dereferences it) and have a non-root path.
///
/// # Errors
///
/// Returns [`AuthError::MalformedInput`] for unparseable URLs or a missing
/// path and [`AuthError::SecurityPolicy`] for any scheme other than `https`.
pub fn validate_client_id_url(raw: &str) -> AuthResult<Url> {
    let url = Url::parse(raw).map_err(|e| AuthError::malformed("client_id URL", format!("{e}: {raw}")))?;

    if url.scheme() != "https" {
        return Err(AuthError::security(format!(
            "client_id URL must use https, got {}: {raw}",
            url.scheme()
        )));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(AuthError::malformed("client_id URL", format!("missing host: {raw}")));
    }

    if url.path().trim_start_matches('/').is_empty() {
        return Err(AuthError::malformed(
            "client_id URL",
            format!("must have a non-root path: {raw}"),
        ));
    }

    Ok(url)
}

/// Validate a client metadata document (generated or fetched)
///
/// # Errors
///
/// - `client_id` rules of [`validate_client_id_url`]
/// - [`AuthError::MalformedInput`] if `redirect_uris` is empty
/// - each redirect URI must be absolute and HTTPS, or HTTP on a loopback host
pub fn validate_client_metadata(document: &ClientMetadataDocument) -> AuthResult<()> {
    validate_client_id_url(&document.client_id)?;

    if document.redirect_uris.is_empty() {
        return Err(AuthError::malformed(
            "redirect_uris",
            "at least one redirect URI is required",
        ));
    }

    for (i, uri) in document.redirect_uris.iter().enumerate() {
        validate_secure_url(uri, &format!("redirect_uris[{i}]"))?;
    }

    Ok(())
}

/// Build this client's metadata document from configuration
///
/// # Errors
///
/// - [`AuthError::Configuration`] if `client_id_metadata_url` is not set
/// - the URL and redirect rules of [`validate_client_metadata`]
pub fn generate_client_metadata(config: &OAuthConfig) -> AuthResult<ClientMetadataDocument> {
    if config.client_id_metadata_url.is_empty() {
        return Err(AuthError::configuration(
            "client_id_metadata_url is required to generate a client metadata document",
        ));
    }
    validate_client_id_url(&config.client_id_metadata_url)?;

    let mut document = ClientMetadataDocument::new(
        config.client_id_metadata_url.clone(),
        vec![config.redirect_url.clone()],
    );
    document.client_name = config.client_name.clone();
    document.client_uri = config.client_uri.clone();
    document.logo_uri = config.logo_uri.clone();
    document.scope = (!config.scopes.is_empty()).then(|| config.scopes.join(" "));
    document.software_id = Some(env!("CARGO_PKG_NAME").to_string());
    document.software_version = Some(env!("CARGO_PKG_VERSION").to_string());

    validate_client_metadata(&document)?;
    Ok(document)
}
