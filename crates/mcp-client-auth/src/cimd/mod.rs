//! # Client ID Metadata Documents
//!
//! A client without a pre-registered client ID can use an HTTPS URL as its
//! client ID. The URL serves a JSON document describing the client; the
//! authorization server dereferences it during authorization.
//!
//! This module covers both directions:
//!
//! - **Hosting**: [`generate_client_metadata`] builds this client's own
//!   document from [`OAuthConfig`](crate::config::OAuthConfig).
//! - **Verifying**: [`MetadataFetcher`] fetches a hosted document and
//!   [`MetadataFetcher::validate_consistency`] checks that it names its own
//!   URL as `client_id`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mcp_client_auth::cimd::{MetadataFetcher, supports_client_id_metadata};
//! # use mcp_client_auth::discovery::AuthorizationServerMetadata;
//!
//! # async fn example(as_metadata: &AuthorizationServerMetadata) -> Result<(), Box<dyn std::error::Error>> {
//! if supports_client_id_metadata(Some(as_metadata)) {
//!     let fetcher = MetadataFetcher::new()?;
//!     fetcher
//!         .validate_consistency("https://app.example.com/oauth/client.json")
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod fetcher;
pub mod types;

pub use fetcher::{MetadataFetcher, ensure_consistent};
pub use types::{
    ClientMetadataDocument, generate_client_metadata, validate_client_id_url,
    validate_client_metadata,
};

use crate::discovery::AuthorizationServerMetadata;

/// Whether the authorization server accepts URL-formatted client IDs
pub fn supports_client_id_metadata(metadata: Option<&AuthorizationServerMetadata>) -> bool {
    metadata.is_some_and(|md| md.client_id_metadata_document_supported)
}
