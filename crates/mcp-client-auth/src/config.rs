//! Client-side OAuth configuration
//!
//! [`OAuthConfig`] is usually deserialized from the caller's settings file.
//! Every field has a default, so an empty object is a valid (disabled)
//! configuration.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::cimd::validate_client_id_url;
use crate::error::{AuthError, AuthResult};
use crate::url_policy::validate_secure_url;

/// Default loopback redirect URL for the local callback listener
pub const DEFAULT_REDIRECT_URL: &str = "http://127.0.0.1:8085/callback";

/// Default time allowed for the interactive authorization step
pub const DEFAULT_AUTHORIZATION_TIMEOUT_SECS: u64 = 300;

/// How the scopes to request are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeSelectionMode {
    /// Use the scopes advertised by the protected resource
    #[default]
    Auto,
    /// Use exactly the scopes the caller asked for
    Manual,
}

/// OAuth client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Whether OAuth is used at all; a disabled configuration is rejected by
    /// [`AuthorizationPlanner::new`](crate::flow::AuthorizationPlanner::new)
    pub enabled: bool,

    /// Pre-registered client ID; always wins when set
    pub client_id: String,

    /// Pre-registered client secret (confidential clients only)
    #[serde(deserialize_with = "deserialize_optional_secret")]
    pub client_secret: Option<SecretString>,

    /// Redirect URL of the local callback listener
    pub redirect_url: String,

    /// HTTPS URL where this client's metadata document is hosted
    pub client_id_metadata_url: String,

    /// Never use the Client ID Metadata Document, even if configured
    pub disable_cimd: bool,

    /// Scope selection strategy
    pub scope_selection_mode: ScopeSelectionMode,

    /// Scopes requested by the caller
    pub scopes: Vec<String>,

    /// Seconds allowed for the interactive authorization step
    pub authorization_timeout_secs: u64,

    /// Skip PKCE validation (also requires `MCP_OAUTH_ALLOW_PKCE_SKIP=true`)
    pub skip_pkce_validation: bool,

    /// Human-readable client name for generated metadata documents
    pub client_name: Option<String>,

    /// Client home page for generated metadata documents
    pub client_uri: Option<String>,

    /// Client logo for generated metadata documents
    pub logo_uri: Option<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            client_secret: None,
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            client_id_metadata_url: String::new(),
            disable_cimd: false,
            scope_selection_mode: ScopeSelectionMode::default(),
            scopes: Vec::new(),
            authorization_timeout_secs: DEFAULT_AUTHORIZATION_TIMEOUT_SECS,
            skip_pkce_validation: false,
            client_name: None,
            client_uri: None,
            logo_uri: None,
        }
    }
}

impl OAuthConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// - `redirect_url` must be an absolute URL using HTTPS, or HTTP on a
    ///   loopback host
    /// - `authorization_timeout_secs` must be non-zero
    /// - a configured `client_id_metadata_url` must be a valid client ID URL
    ///   unless CIMD is disabled
    pub fn validate(&self) -> AuthResult<()> {
        validate_secure_url(&self.redirect_url, "redirect_url")?;

        if self.authorization_timeout_secs == 0 {
            return Err(AuthError::configuration(
                "authorization_timeout_secs must be greater than zero",
            ));
        }

        if !self.disable_cimd && !self.client_id_metadata_url.is_empty() {
            validate_client_id_url(&self.client_id_metadata_url)?;
        }

        Ok(())
    }

    /// Time allowed for the interactive authorization step
    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_secs(self.authorization_timeout_secs)
    }

    /// Whether a non-empty client secret is configured
    pub fn is_confidential(&self) -> bool {
        self.client_secret
            .as_ref()
            .is_some_and(|secret| !secret.expose_secret().is_empty())
    }
}

pub(crate) fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.is_empty()).map(SecretString::new))
}
