//! # Discovery Document Fetcher
//!
//! Sequential, priority-ordered fetcher for RFC 8414 and OpenID Connect
//! discovery documents.

use tracing::{debug, warn};
use url::Url;

use super::types::AuthorizationServerMetadata;
use crate::error::{AuthError, AuthResult, ErrorKind};
use crate::fetch::{FetcherConfig, JsonFetcher};
use crate::url_policy::validate_secure_url;

const OAUTH_WELL_KNOWN: &str = ".well-known/oauth-authorization-server";
const OIDC_WELL_KNOWN: &str = ".well-known/openid-configuration";

/// Build the ordered list of discovery URLs for an issuer
///
/// For an issuer with path `p` (leading and trailing slashes stripped):
///
/// 1. `{origin}/.well-known/oauth-authorization-server/{p}`
/// 2. `{origin}/.well-known/openid-configuration/{p}`
/// 3. `{origin}/{p}/.well-known/openid-configuration`
///
/// For an issuer without a path:
///
/// 1. `{origin}/.well-known/oauth-authorization-server`
/// 2. `{origin}/.well-known/openid-configuration`
///
/// Query and fragment of the issuer are dropped.
pub fn discovery_candidates(issuer: &Url) -> Vec<Url> {
    let path = issuer.path().trim_matches('/');

    let paths = if path.is_empty() {
        vec![format!("/{OAUTH_WELL_KNOWN}"), format!("/{OIDC_WELL_KNOWN}")]
    } else {
        vec![
            format!("/{OAUTH_WELL_KNOWN}/{path}"),
            format!("/{OIDC_WELL_KNOWN}/{path}"),
            format!("/{path}/{OIDC_WELL_KNOWN}"),
        ]
    };

    paths
        .into_iter()
        .map(|candidate_path| {
            let mut url = issuer.clone();
            url.set_path(&candidate_path);
            url.set_query(None);
            url.set_fragment(None);
            url
        })
        .collect()
}

/// Authorization server metadata fetcher
///
/// Tries each discovery candidate strictly in order and returns the first
/// document that both fetches and validates. Candidates are never raced: a
/// lower-priority endpoint must not win because it answers faster.
#[derive(Debug, Clone)]
pub struct DiscoveryFetcher {
    fetcher: JsonFetcher,
}

impl DiscoveryFetcher {
    /// Create a new discovery fetcher with default configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn new() -> AuthResult<Self> {
        Self::with_config(FetcherConfig::discovery())
    }

    /// Create a new discovery fetcher with custom configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn with_config(config: FetcherConfig) -> AuthResult<Self> {
        Ok(Self {
            fetcher: JsonFetcher::new(config)?,
        })
    }

    /// Discover and validate metadata for an issuer
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedInput`] / [`AuthError::SchemeViolation`] if the
    ///   issuer URL itself is unacceptable (no request is made)
    /// - [`AuthError::MetadataNotFound`] if no candidate produced a response
    /// - [`AuthError::NoMetadataFound`] wrapping the last candidate error if
    ///   every candidate failed
    pub async fn discover(&self, issuer: &str) -> AuthResult<AuthorizationServerMetadata> {
        let issuer_url = validate_secure_url(issuer, "issuer URL")?;

        let mut last_error = None;
        let mut reached_server = false;
        for candidate in discovery_candidates(&issuer_url) {
            debug!(issuer, candidate = %candidate, "Trying authorization server discovery");

            match self.fetch_candidate(&candidate).await {
                Ok(metadata) => {
                    if metadata.issuer != issuer {
                        warn!(
                            issuer,
                            document_issuer = %metadata.issuer,
                            "Discovered metadata names a different issuer"
                        );
                    }
                    debug!(issuer, candidate = %candidate, "Discovered authorization server metadata");
                    return Ok(metadata);
                }
                Err(e) => {
                    debug!(candidate = %candidate, error = %e, "Discovery candidate failed");
                    reached_server |= e.kind() != ErrorKind::NetworkFailure;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(source) if reached_server => {
                warn!(issuer, "All authorization server discovery candidates failed");
                Err(AuthError::NoMetadataFound {
                    issuer: issuer.to_string(),
                    source: Box::new(source),
                })
            }
            _ => {
                warn!(issuer, "No authorization server discovery candidate could be reached");
                Err(AuthError::MetadataNotFound {
                    issuer: issuer.to_string(),
                })
            }
        }
    }

    async fn fetch_candidate(&self, candidate: &Url) -> AuthResult<AuthorizationServerMetadata> {
        let metadata: AuthorizationServerMetadata = self.fetcher.fetch_json(candidate).await?;
        metadata.validate()?;
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(urls: Vec<Url>) -> Vec<String> {
        urls.into_iter().map(String::from).collect()
    }

    #[test]
    fn test_fetcher_creation() {
        assert!(DiscoveryFetcher::new().is_ok());
    }

    #[test]
    fn test_candidates_without_path() {
        let issuer = Url::parse("https://auth.example.com").unwrap();
        assert_eq!(
            strings(discovery_candidates(&issuer)),
            vec![
                "https://auth.example.com/.well-known/oauth-authorization-server",
                "https://auth.example.com/.well-known/openid-configuration",
            ]
        );

        let issuer = Url::parse("https://auth.example.com/").unwrap();
        assert_eq!(discovery_candidates(&issuer).len(), 2);
    }

    #[test]
    fn test_candidates_with_path() {
        let issuer = Url::parse("https://auth.example.com/tenant1/").unwrap();
        assert_eq!(
            strings(discovery_candidates(&issuer)),
            vec![
                "https://auth.example.com/.well-known/oauth-authorization-server/tenant1",
                "https://auth.example.com/.well-known/openid-configuration/tenant1",
                "https://auth.example.com/tenant1/.well-known/openid-configuration",
            ]
        );
    }

    #[test]
    fn test_candidates_keep_port_and_drop_query() {
        let issuer = Url::parse("http://127.0.0.1:9000/realms/dev?x=1#frag").unwrap();
        assert_eq!(
            strings(discovery_candidates(&issuer))[0],
            "http://127.0.0.1:9000/.well-known/oauth-authorization-server/realms/dev"
        );
    }

    #[tokio::test]
    async fn test_plaintext_issuer_rejected_before_any_request() {
        let fetcher = DiscoveryFetcher::new().unwrap();
        let err = fetcher.discover("http://auth.example.com").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemeViolation);
    }

    #[tokio::test]
    async fn test_unreachable_issuer_is_not_found() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = DiscoveryFetcher::new().unwrap();
        let err = fetcher
            .discover(&format!("http://{addr}/tenant1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MetadataNotFound { .. }), "{err}");
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
    }

    #[tokio::test]
    async fn test_relative_issuer_rejected() {
        let fetcher = DiscoveryFetcher::new().unwrap();
        let err = fetcher.discover("auth.example.com/tenant").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    proptest! {
        #[test]
        fn prop_candidate_order(host in "[a-z]{1,10}\\.example", segs in proptest::collection::vec("[a-z0-9]{1,8}", 0..4)) {
            let path = segs.join("/");
            let issuer = Url::parse(&format!("https://{host}/{path}")).unwrap();
            let candidates = strings(discovery_candidates(&issuer));

            if path.is_empty() {
                prop_assert_eq!(candidates, vec![
                    format!("https://{host}/.well-known/oauth-authorization-server"),
                    format!("https://{host}/.well-known/openid-configuration"),
                ]);
            } else {
                prop_assert_eq!(candidates, vec![
                    format!("https://{host}/.well-known/oauth-authorization-server/{path}"),
                    format!("https://{host}/.well-known/openid-configuration/{path}"),
                    format!("https://{host}/{path}/.well-known/openid-configuration"),
                ]);
            }
        }
    }
}
