//! # HTTP Transport Decorators
//!
//! Tower middleware for the HTTP requests an MCP client sends to its
//! authorization server.
//!
//! - [`ResourceLayer`] adds the RFC 8707 `resource` parameter so issued
//!   tokens are audience-restricted to one MCP server.
//! - [`RegistrationTokenLayer`] attaches an initial access token to Dynamic
//!   Client Registration requests, for one registration origin only.
//! - [`ReqwestTransport`] is the base service that actually sends requests.
//! - `OAuth2HttpClient` (feature `oauth2`) lets the `oauth2` crate drive any
//!   such stack.
//!
//! Requests and responses are `http::Request<Vec<u8>>` and
//! `http::Response<Vec<u8>>`, the same shapes the `oauth2` crate uses.
//!
//! ```rust,no_run
//! use tower::ServiceBuilder;
//! use mcp_client_auth::transport::{ReqwestTransport, ResourceLayer};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ServiceBuilder::new()
//!     .layer(ResourceLayer::new("https://mcp.example.com/mcp")?)
//!     .service(ReqwestTransport::new()?);
//! # let _ = transport;
//! # Ok(())
//! # }
//! ```

pub mod registration;
pub mod resource;
pub mod reqwest_transport;

#[cfg(feature = "oauth2")]
pub mod oauth2_adapter;

pub use registration::{RegistrationTokenLayer, RegistrationTokenService};
pub use resource::{ResourceLayer, ResourceService};
pub use reqwest_transport::ReqwestTransport;

#[cfg(feature = "oauth2")]
pub use oauth2_adapter::{OAuth2CodeExchanger, OAuth2HttpClient};

use futures_util::future::BoxFuture;

use crate::error::{AuthError, AuthResult};
use crate::url_policy::validate_secure_url;

/// HTTP request shape handled by the transport stack
pub type HttpRequest = http::Request<Vec<u8>>;
/// HTTP response shape handled by the transport stack
pub type HttpResponse = http::Response<Vec<u8>>;

/// Future returned by every service in this module
pub type TransportFuture = BoxFuture<'static, AuthResult<HttpResponse>>;

/// Canonicalise a resource URI for use as an RFC 8707 resource indicator
///
/// Scheme and host are lowercased, default ports dropped, query removed and a
/// trailing slash trimmed (except for the root path). Fragments are rejected.
///
/// ```rust
/// use mcp_client_auth::transport::canonical_resource_uri;
///
/// assert_eq!(
///     canonical_resource_uri("HTTPS://MCP.Example.com:443/mcp/").unwrap(),
///     "https://mcp.example.com/mcp"
/// );
/// assert!(canonical_resource_uri("https://mcp.example.com/#frag").is_err());
/// ```
///
/// # Errors
///
/// Returns an error for malformed or insecure URIs and for URIs with a
/// fragment.
pub fn canonical_resource_uri(raw: &str) -> AuthResult<String> {
    let url = validate_secure_url(raw, "resource URI")?;

    if url.fragment().is_some() {
        return Err(AuthError::malformed(
            "resource URI",
            format!("must not contain a fragment: {raw}"),
        ));
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    let path = match url.path() {
        "/" => "/",
        p => p.trim_end_matches('/'),
    };

    Ok(format!("{}://{host}{port}{path}", url.scheme()))
}
