//! # Authorization Server Metadata Discovery
//!
//! Discovers OAuth 2.0 authorization server metadata for an issuer, trying
//! RFC 8414 first and falling back to OpenID Connect Discovery.
//!
//! ## Discovery Order
//!
//! For an issuer with a path component, e.g. `https://auth.example.com/tenant1`:
//!
//! 1. `https://auth.example.com/.well-known/oauth-authorization-server/tenant1`
//! 2. `https://auth.example.com/.well-known/openid-configuration/tenant1`
//! 3. `https://auth.example.com/tenant1/.well-known/openid-configuration`
//!
//! For an issuer without a path:
//!
//! 1. `https://auth.example.com/.well-known/oauth-authorization-server`
//! 2. `https://auth.example.com/.well-known/openid-configuration`
//!
//! The first candidate that returns a valid document wins. Nothing is cached.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mcp_client_auth::discovery::DiscoveryFetcher;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = DiscoveryFetcher::new()?;
//! let metadata = fetcher.discover("https://auth.example.com/tenant1").await?;
//!
//! println!("Token endpoint: {}", metadata.token_endpoint);
//! # Ok(())
//! # }
//! ```

pub mod fetcher;
pub mod types;

pub use fetcher::{DiscoveryFetcher, discovery_candidates};
pub use types::{AuthorizationServerMetadata, PKCE_METHOD_S256};
