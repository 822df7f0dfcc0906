//! # MCP Client Auth - OAuth 2.1 Discovery and Validation for MCP Clients
//!
//! Everything an MCP client needs to decide *how* to authorize against a
//! protected MCP server before the user ever sees a browser window.
//!
//! ## Key Features
//!
//! - **Authorization server discovery** - RFC 8414 with OpenID Connect
//!   fallback, including path-based (multi-tenant) issuers
//! - **Protected resource metadata** - RFC 9728 discovery of the
//!   authorization servers that protect an MCP server
//! - **Resource indicators** - RFC 8707 `resource` parameter added by tower
//!   middleware
//! - **PKCE enforcement** - S256 required, with a two-key escape hatch
//! - **Client ID Metadata Documents** - generation, validation and hosted
//!   consistency checks
//! - **Dynamic Client Registration** - RFC 7591 fallback with an
//!   origin-scoped initial access token
//!
//! ## Architecture
//!
//! - [`url_policy`] - HTTPS-except-loopback rule shared by every URL check
//! - [`fetch`] - Hardened JSON fetcher (TLS 1.2+, no redirects, size caps)
//! - [`discovery`] - Authorization server metadata discovery
//! - [`resource_metadata`] - Protected resource metadata discovery
//! - [`pkce`] - PKCE capability validation
//! - [`cimd`] - Client ID Metadata Documents
//! - [`client_id`] - Client identification strategy
//! - [`scopes`] - Scope selection
//! - [`transport`] - Tower middleware for authorization server requests
//! - [`dcr`] - Dynamic Client Registration
//! - [`flow`] - End-to-end authorization planning
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcp_client_auth::{AuthorizationPlanner, OAuthConfig};
//!
//! # async fn example() -> Result<(), mcp_client_auth::AuthError> {
//! let config = OAuthConfig {
//!     enabled: true,
//!     client_id: "my-client".to_string(),
//!     ..Default::default()
//! };
//!
//! let planner = AuthorizationPlanner::new(config)?;
//! let plan = planner.plan("https://mcp.example.com/mcp", &[]).await?;
//!
//! println!("Authorize at {}", plan.authorization_endpoint());
//! println!("Requesting scopes {:?}", plan.scopes);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `oauth2` (default) - `oauth2` crate adapter, authorization URL building
//!   and code exchange
//!
//! ## Standards Compliance
//!
//! - **RFC 6749** - OAuth 2.0 Authorization Framework
//! - **RFC 7591** - OAuth 2.0 Dynamic Client Registration
//! - **RFC 7636** - Proof Key for Code Exchange (PKCE)
//! - **RFC 8414** - OAuth 2.0 Authorization Server Metadata
//! - **RFC 8707** - OAuth 2.0 Resource Indicators
//! - **RFC 9728** - OAuth 2.0 Protected Resource Metadata

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cimd;
pub mod client_id;
pub mod config;
pub mod dcr;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod flow;
pub mod pkce;
pub mod resource_metadata;
pub mod scopes;
pub mod transport;
pub mod url_policy;

#[doc(inline)]
pub use error::{AuthError, AuthResult, ErrorKind};

#[doc(inline)]
pub use config::{OAuthConfig, ScopeSelectionMode};

#[doc(inline)]
pub use discovery::{AuthorizationServerMetadata, DiscoveryFetcher};

#[doc(inline)]
pub use resource_metadata::{ProtectedResourceMetadata, ResourceMetadataFetcher};

#[doc(inline)]
pub use cimd::{ClientMetadataDocument, MetadataFetcher};

#[doc(inline)]
pub use client_id::ClientIdentification;

#[doc(inline)]
pub use flow::{
    AuthorizationPlan, AuthorizationPlanner, TokenExchangeRequest, TokenExchanger, TokenSet,
};

#[cfg(feature = "oauth2")]
#[doc(inline)]
pub use flow::AuthorizationRequest;

pub use url_policy::{is_loopback_host, validate_secure_url};
