//! # Authorization Server Metadata Types
//!
//! OAuth 2.0 Authorization Server Metadata (RFC 8414). OpenID Connect
//! discovery documents are a superset of this shape, so both candidate kinds
//! deserialize into [`AuthorizationServerMetadata`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AuthError, AuthResult};
use crate::url_policy::validate_secure_url;

/// The PKCE challenge method MCP clients must use
pub const PKCE_METHOD_S256: &str = "S256";

/// OAuth 2.0 Authorization Server Metadata (RFC 8414)
///
/// ## Required Fields
///
/// - `issuer`, `authorization_endpoint`, `token_endpoint`: absolute URLs
///   using HTTPS (HTTP only for loopback hosts)
///
/// ## Example
///
/// ```json
/// {
///   "issuer": "https://auth.example.com",
///   "authorization_endpoint": "https://auth.example.com/authorize",
///   "token_endpoint": "https://auth.example.com/token",
///   "registration_endpoint": "https://auth.example.com/register",
///   "code_challenge_methods_supported": ["S256"],
///   "client_id_metadata_document_supported": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorizationServerMetadata {
    /// REQUIRED. The authorization server's issuer identifier
    pub issuer: String,

    /// REQUIRED. URL of the authorization endpoint
    pub authorization_endpoint: String,

    /// REQUIRED. URL of the token endpoint
    pub token_endpoint: String,

    /// URL of the dynamic client registration endpoint (RFC 7591)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,

    /// PKCE code challenge methods supported (RFC 7636)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,

    /// Whether the server accepts URL-formatted client IDs backed by a
    /// Client ID Metadata Document
    #[serde(default)]
    pub client_id_metadata_document_supported: bool,

    /// JSON array containing scope values supported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// JSON array containing OAuth 2.0 response_type values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_types_supported: Option<Vec<String>>,

    /// JSON array containing OAuth 2.0 grant_type values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,

    /// JSON array containing client authentication methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,

    /// Additional metadata fields
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

impl AuthorizationServerMetadata {
    /// Validate required fields and endpoint schemes
    ///
    /// # Errors
    ///
    /// - [`AuthError::Protocol`] if a required field is empty
    /// - [`AuthError::MalformedInput`] if an endpoint is not an absolute URL
    /// - [`AuthError::SchemeViolation`] if an endpoint uses HTTP on a
    ///   non-loopback host
    pub fn validate(&self) -> AuthResult<()> {
        for (field, value) in [
            ("issuer", &self.issuer),
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::protocol(
                    &self.issuer,
                    format!("missing required field {field}"),
                ));
            }
            validate_secure_url(value, field)?;
        }

        if let Some(ref registration_endpoint) = self.registration_endpoint {
            validate_secure_url(registration_endpoint, "registration_endpoint")?;
        }

        Ok(())
    }

    /// Check if any PKCE method is advertised
    pub fn supports_pkce(&self) -> bool {
        self.code_challenge_methods_supported
            .as_ref()
            .is_some_and(|methods| !methods.is_empty())
    }

    /// Check if a specific PKCE method is advertised
    pub fn supports_pkce_method(&self, method: &str) -> bool {
        self.code_challenge_methods_supported
            .as_ref()
            .is_some_and(|methods| methods.iter().any(|m| m == method))
    }

    /// Get the scopes supported (empty if not advertised)
    pub fn scopes(&self) -> &[String] {
        self.scopes_supported.as_deref().unwrap_or_default()
    }
}
