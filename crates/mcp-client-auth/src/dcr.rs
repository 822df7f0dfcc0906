//! OAuth 2.0 Dynamic Client Registration (RFC 7591)
//!
//! Used when no pre-registered client ID is configured and the authorization
//! server does not accept Client ID Metadata Documents. Requests go through a
//! [`RegistrationTokenService`] so an initial access token, when required, is
//! only ever sent to the registration endpoint's origin over HTTPS.
//!
//! # Example
//!
//! ```rust,no_run
//! use mcp_client_auth::config::OAuthConfig;
//! use mcp_client_auth::dcr::{DcrClient, RegistrationRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OAuthConfig::default();
//! let client = DcrClient::new("https://auth.example.com/register", None)?;
//!
//! let request = RegistrationRequest::for_public_client(&config, &["mcp:tools".to_string()]);
//! let response = client.register(&request).await?;
//! println!("Registered client ID: {}", response.client_id);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use http::header::{ACCEPT, CONTENT_TYPE};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower::{Layer, ServiceExt};
use tracing::{debug, info};
use url::Url;

use crate::config::{OAuthConfig, deserialize_optional_secret};
use crate::error::{AuthError, AuthResult};
use crate::transport::{RegistrationTokenLayer, RegistrationTokenService, ReqwestTransport};
use crate::url_policy::validate_secure_url;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Client registration request (RFC 7591 §2)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationRequest {
    /// Redirect URIs
    pub redirect_uris: Vec<String>,

    /// Token endpoint authentication method
    pub token_endpoint_auth_method: String,

    /// Grant types the client will use
    pub grant_types: Vec<String>,

    /// Response types the client will use
    pub response_types: Vec<String>,

    /// Human-readable client name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    /// Client homepage URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_uri: Option<String>,

    /// Logo URI for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,

    /// Space-separated list of OAuth scopes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Software identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_id: Option<String>,

    /// Software version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,

    /// Application type (`native` for loopback redirect listeners)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_type: Option<String>,
}

impl RegistrationRequest {
    /// Registration metadata for a public authorization-code + PKCE client
    pub fn for_public_client(config: &OAuthConfig, scopes: &[String]) -> Self {
        Self {
            redirect_uris: vec![config.redirect_url.clone()],
            token_endpoint_auth_method: "none".to_string(),
            grant_types: vec!["authorization_code".to_string()],
            response_types: vec!["code".to_string()],
            client_name: Some(
                config
                    .client_name
                    .clone()
                    .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
            ),
            client_uri: config.client_uri.clone(),
            logo_uri: config.logo_uri.clone(),
            scope: (!scopes.is_empty()).then(|| scopes.join(" ")),
            software_id: Some(env!("CARGO_PKG_NAME").to_string()),
            software_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            application_type: Some("native".to_string()),
        }
    }
}

/// Client registration response (RFC 7591 §3.2)
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    /// Issued client identifier
    pub client_id: String,

    /// Client secret, for confidential clients
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub client_secret: Option<SecretString>,

    /// Client secret expiration time (seconds since epoch, 0 = never)
    #[serde(default)]
    pub client_secret_expires_at: Option<u64>,

    /// Client ID issued at timestamp
    #[serde(default)]
    pub client_id_issued_at: Option<u64>,

    /// Token for managing the registration (RFC 7592)
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub registration_access_token: Option<SecretString>,

    /// Management URI for this registration (RFC 7592)
    #[serde(default)]
    pub registration_client_uri: Option<String>,

    /// Remaining registered metadata
    #[serde(flatten)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// RFC 7591 §3.2.2 error body
#[derive(Debug, Deserialize)]
struct RegistrationErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Dynamic Client Registration client
#[derive(Debug, Clone)]
pub struct DcrClient {
    endpoint: Url,
    service: RegistrationTokenService<ReqwestTransport>,
}

impl DcrClient {
    /// Create a client for `endpoint`, optionally with an initial access token
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is malformed or insecure, or the HTTP
    /// client cannot be built.
    pub fn new(endpoint: &str, initial_access_token: Option<SecretString>) -> AuthResult<Self> {
        Self::with_transport(endpoint, initial_access_token, ReqwestTransport::new()?)
    }

    /// Create a client on top of an existing transport
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is malformed or insecure.
    pub fn with_transport(
        endpoint: &str,
        initial_access_token: Option<SecretString>,
        transport: ReqwestTransport,
    ) -> AuthResult<Self> {
        let endpoint_url = validate_secure_url(endpoint, "registration_endpoint")?;
        let layer = RegistrationTokenLayer::new(endpoint, initial_access_token)?;
        Ok(Self {
            endpoint: endpoint_url,
            service: layer.layer(transport),
        })
    }

    /// Registration endpoint
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Register a new client
    ///
    /// # Errors
    ///
    /// - network failures
    /// - [`AuthError::Protocol`] for a non-success status or an unparseable
    ///   response
    /// - [`AuthError::SecurityPolicy`] if an initial access token would be
    ///   sent over plaintext
    pub async fn register(&self, request: &RegistrationRequest) -> AuthResult<RegistrationResponse> {
        let body = serde_json::to_vec(request).map_err(|e| {
            AuthError::configuration(format!("Failed to serialize registration request: {e}"))
        })?;

        let http_request = http::Request::post(self.endpoint.as_str())
            .header(CONTENT_TYPE, JSON_MEDIA_TYPE)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .body(body)
            .map_err(|e| AuthError::malformed("registration request", e.to_string()))?;

        debug!(endpoint = %self.endpoint, "Sending dynamic client registration request");
        let response = self.service.clone().oneshot(http_request).await?;

        let status = response.status();
        if !status.is_success() {
            let reason = match serde_json::from_slice::<RegistrationErrorBody>(response.body()) {
                Ok(body) => match body.error_description {
                    Some(description) => format!("HTTP {status}: {} ({description})", body.error),
                    None => format!("HTTP {status}: {}", body.error),
                },
                Err(_) => format!("HTTP {status}"),
            };
            return Err(AuthError::protocol(self.endpoint.as_str(), reason));
        }

        let registration: RegistrationResponse = serde_json::from_slice(response.body())
            .map_err(|e| {
                AuthError::protocol(
                    self.endpoint.as_str(),
                    format!("Invalid registration response: {e}"),
                )
            })?;

        if registration.client_id.is_empty() {
            return Err(AuthError::protocol(
                self.endpoint.as_str(),
                "registration response has an empty client_id",
            ));
        }

        info!(endpoint = %self.endpoint, client_id = %registration.client_id, "Registered OAuth client");
        Ok(registration)
    }
}
