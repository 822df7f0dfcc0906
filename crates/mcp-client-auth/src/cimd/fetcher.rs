//! # Client Metadata Document Fetcher
//!
//! Single-URL fetcher for Client ID Metadata Documents. Documents are
//! validated on receipt and never cached.

use tracing::debug;
use url::Url;

use super::types::{ClientMetadataDocument, validate_client_id_url, validate_client_metadata};
use crate::error::{AuthError, AuthResult};
use crate::fetch::{FetcherConfig, JsonFetcher};

/// Client metadata document fetcher
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    fetcher: JsonFetcher,
}

impl MetadataFetcher {
    /// Create a new metadata fetcher with the 100 KiB document limit
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn new() -> AuthResult<Self> {
        Self::with_config(FetcherConfig::client_metadata())
    }

    /// Create a new metadata fetcher with custom configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn with_config(config: FetcherConfig) -> AuthResult<Self> {
        Ok(Self {
            fetcher: JsonFetcher::new(config)?,
        })
    }

    /// Fetch and validate the document at a client ID URL
    ///
    /// The URL is checked before any request is made.
    ///
    /// # Errors
    ///
    /// Client ID URL violations, fetch failures, and documents failing
    /// [`validate_client_metadata`].
    pub async fn fetch(&self, client_id_url: &str) -> AuthResult<ClientMetadataDocument> {
        let url = validate_client_id_url(client_id_url)?;
        self.fetch_document(&url).await
    }

    /// Fetch the document at `client_id_url` and require that it names
    /// exactly that URL as its `client_id`
    ///
    /// # Errors
    ///
    /// Everything [`fetch`](Self::fetch) reports, plus
    /// [`AuthError::SecurityPolicy`] when the document's `client_id` differs
    /// from `client_id_url` in any byte.
    pub async fn validate_consistency(
        &self,
        client_id_url: &str,
    ) -> AuthResult<ClientMetadataDocument> {
        let document = self.fetch(client_id_url).await?;
        ensure_consistent(client_id_url, &document)?;
        Ok(document)
    }

    async fn fetch_document(&self, url: &Url) -> AuthResult<ClientMetadataDocument> {
        debug!(url = %url, "Fetching client metadata document");

        let document: ClientMetadataDocument = self.fetcher.fetch_json(url).await?;
        validate_client_metadata(&document).map_err(|e| {
            AuthError::protocol(url.as_str(), format!("invalid client metadata: {e}"))
        })?;

        Ok(document)
    }
}

/// Require `document.client_id` to equal the URL it was fetched from
///
/// # Errors
///
/// Returns [`AuthError::SecurityPolicy`] on any difference, including a
/// trailing slash or host case.
pub fn ensure_consistent(client_id_url: &str, document: &ClientMetadataDocument) -> AuthResult<()> {
    if document.client_id != client_id_url {
        return Err(AuthError::security(format!(
            "client_id in document ({}) does not match URL ({client_id_url})",
            document.client_id
        )));
    }
    Ok(())
}
