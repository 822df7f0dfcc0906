//! Client identification strategy selection
//!
//! Precedence: a pre-registered client ID, then a Client ID Metadata Document
//! URL, then Dynamic Client Registration. Selection is pure; nothing is
//! fetched or registered here.

use crate::config::OAuthConfig;

/// How this client identifies itself to the authorization server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdentification {
    /// Statically registered client ID
    PreRegistered(String),
    /// Client ID is the URL of a hosted metadata document
    MetadataDocument(String),
    /// No identity configured; the caller must register dynamically
    DynamicRegistration,
}

impl ClientIdentification {
    /// The resolved client ID, `None` when registration is still required
    pub fn client_id(&self) -> Option<&str> {
        match self {
            Self::PreRegistered(id) | Self::MetadataDocument(id) => Some(id),
            Self::DynamicRegistration => None,
        }
    }

    /// Whether Dynamic Client Registration has to be attempted
    pub fn requires_registration(&self) -> bool {
        matches!(self, Self::DynamicRegistration)
    }
}

/// Pick the client identification strategy for `config`
pub fn resolve_client_identification(config: &OAuthConfig) -> ClientIdentification {
    if !config.client_id.is_empty() {
        ClientIdentification::PreRegistered(config.client_id.clone())
    } else if !config.client_id_metadata_url.is_empty() && !config.disable_cimd {
        ClientIdentification::MetadataDocument(config.client_id_metadata_url.clone())
    } else {
        ClientIdentification::DynamicRegistration
    }
}
