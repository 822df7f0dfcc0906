//! # Authorization Planning
//!
//! [`AuthorizationPlanner`] runs the full discovery sequence for one MCP
//! server and produces an [`AuthorizationPlan`]: who to talk to, as which
//! client, for which scopes, bound to which resource.
//!
//! 1. Protected resource metadata (falls back to the server origin as issuer
//!    when the server publishes none)
//! 2. Authorization server metadata
//! 3. PKCE capability check
//! 4. Client identification: pre-registered ID, then Client ID Metadata
//!    Document (only if the server supports it and the hosted document is
//!    consistent), then Dynamic Client Registration
//! 5. Scope selection
//!
//! The interactive part (browser, callback listener) is left to the caller.
//! The plan hands out decorated transports and a [`TokenExchangeRequest`];
//! the actual exchange goes through a [`TokenExchanger`].

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tower::Layer;
use tracing::{debug, info, warn};

use crate::cimd::{MetadataFetcher, supports_client_id_metadata};
use crate::client_id::{ClientIdentification, resolve_client_identification};
use crate::config::OAuthConfig;
use crate::dcr::{DcrClient, RegistrationRequest, RegistrationResponse};
use crate::discovery::{AuthorizationServerMetadata, DiscoveryFetcher};
use crate::error::{AuthError, AuthResult};
use crate::pkce::validate_pkce_support;
use crate::resource_metadata::{ProtectedResourceMetadata, ResourceMetadataFetcher};
use crate::scopes::select_scopes;
use crate::transport::{
    RegistrationTokenLayer, RegistrationTokenService, ReqwestTransport, ResourceLayer,
    ResourceService, canonical_resource_uri,
};
use crate::url_policy::{origin_of, validate_secure_url};

/// Tokens returned by a successful code exchange
#[derive(Debug, Clone)]
pub struct TokenSet {
    /// Access token
    pub access_token: SecretString,
    /// Token type, usually `Bearer`
    pub token_type: String,
    /// Lifetime of the access token
    pub expires_in: Option<Duration>,
    /// Refresh token, if issued
    pub refresh_token: Option<SecretString>,
    /// Granted scopes, if the server reported them
    pub scopes: Vec<String>,
}

/// Everything needed to exchange an authorization code
#[derive(Debug, Clone)]
pub struct TokenExchangeRequest {
    /// Token endpoint of the authorization server
    pub token_endpoint: String,
    /// Client identifier
    pub client_id: String,
    /// Client secret for confidential clients
    pub client_secret: Option<SecretString>,
    /// Authorization code received on the redirect
    pub code: SecretString,
    /// PKCE code verifier matching the S256 challenge that was sent
    pub code_verifier: SecretString,
    /// Redirect URL used in the authorization request
    pub redirect_url: String,
    /// Canonical resource indicator
    pub resource: String,
    /// Scopes that were requested
    pub scopes: Vec<String>,
}

/// Performs the authorization-code-for-token exchange
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange the code described by `request` for tokens
    async fn exchange(&self, request: TokenExchangeRequest) -> AuthResult<TokenSet>;
}

/// Result of authorization planning for one MCP server
#[derive(Debug, Clone)]
pub struct AuthorizationPlan {
    /// Canonical resource indicator of the MCP server
    pub resource: String,
    /// Protected resource metadata, if the server publishes it
    pub resource_metadata: Option<ProtectedResourceMetadata>,
    /// Validated authorization server metadata
    pub authorization_server: AuthorizationServerMetadata,
    /// Strategy the client ID was obtained by
    pub identification: ClientIdentification,
    /// Client ID to use
    pub client_id: String,
    /// Client secret, for pre-registered or registered confidential clients
    pub client_secret: Option<SecretString>,
    /// Registration response, when the client was registered dynamically
    pub registration: Option<RegistrationResponse>,
    /// Scopes to request
    pub scopes: Vec<String>,
    /// Redirect URL of the local callback listener
    pub redirect_url: String,
    /// Time allowed for the code exchange
    pub authorization_timeout: Duration,
}

impl AuthorizationPlan {
    /// Authorization endpoint
    pub fn authorization_endpoint(&self) -> &str {
        &self.authorization_server.authorization_endpoint
    }

    /// Token endpoint
    pub fn token_endpoint(&self) -> &str {
        &self.authorization_server.token_endpoint
    }

    /// Registration endpoint, if the server offers one
    pub fn registration_endpoint(&self) -> Option<&str> {
        self.authorization_server.registration_endpoint.as_deref()
    }

    /// Transport for authorization and token requests, with the resource
    /// indicator added to every request
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn resource_transport(&self) -> AuthResult<ResourceService<ReqwestTransport>> {
        Ok(ResourceLayer::new(&self.resource)?.layer(ReqwestTransport::new()?))
    }

    /// Transport for registration requests, scoped to the registration
    /// endpoint's origin
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the server has no registration
    /// endpoint.
    pub fn registration_transport(
        &self,
        initial_access_token: Option<SecretString>,
    ) -> AuthResult<RegistrationTokenService<ResourceService<ReqwestTransport>>> {
        let endpoint = self.registration_endpoint().ok_or_else(|| {
            AuthError::configuration(format!(
                "authorization server {} has no registration endpoint",
                self.authorization_server.issuer
            ))
        })?;

        Ok(RegistrationTokenLayer::new(endpoint, initial_access_token)?
            .layer(self.resource_transport()?))
    }

    /// Build the token exchange request for a received authorization code
    pub fn exchange_request(
        &self,
        code: SecretString,
        code_verifier: SecretString,
    ) -> TokenExchangeRequest {
        TokenExchangeRequest {
            token_endpoint: self.token_endpoint().to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            code,
            code_verifier,
            redirect_url: self.redirect_url.clone(),
            resource: self.resource.clone(),
            scopes: self.scopes.clone(),
        }
    }

    /// Exchange an authorization code, bounded by the authorization timeout
    ///
    /// # Errors
    ///
    /// Whatever `exchanger` reports, or [`AuthError::Network`] when the
    /// timeout elapses first.
    pub async fn exchange_code<E>(
        &self,
        exchanger: &E,
        code: SecretString,
        code_verifier: SecretString,
    ) -> AuthResult<TokenSet>
    where
        E: TokenExchanger + ?Sized,
    {
        let request = self.exchange_request(code, code_verifier);

        tokio::time::timeout(self.authorization_timeout, exchanger.exchange(request))
            .await
            .map_err(|_| {
                AuthError::network(
                    self.token_endpoint(),
                    format!(
                        "token exchange timed out after {}s",
                        self.authorization_timeout.as_secs()
                    ),
                )
            })?
    }
}

#[cfg(feature = "oauth2")]
mod authorize {
    use oauth2::basic::BasicClient;
    use oauth2::{AuthUrl, ClientId, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope};
    use secrecy::SecretString;
    use url::Url;

    use super::AuthorizationPlan;
    use crate::error::{AuthError, AuthResult};

    /// Browser URL plus the state the callback must be checked against
    #[derive(Debug, Clone)]
    pub struct AuthorizationRequest {
        /// URL to open in the user's browser
        pub url: Url,
        /// CSRF state expected on the redirect
        pub state: String,
        /// PKCE verifier to send with the code exchange
        pub code_verifier: SecretString,
    }

    impl AuthorizationPlan {
        /// Build the authorization URL with an S256 PKCE challenge, the
        /// selected scopes, and the resource indicator
        ///
        /// # Errors
        ///
        /// Returns [`AuthError::MalformedInput`] if an endpoint cannot be used
        /// by the OAuth client.
        pub fn authorization_request(&self) -> AuthResult<AuthorizationRequest> {
            let auth_url = AuthUrl::new(self.authorization_endpoint().to_string())
                .map_err(|e| AuthError::malformed("authorization_endpoint", e.to_string()))?;
            let redirect_url = RedirectUrl::new(self.redirect_url.clone())
                .map_err(|e| AuthError::malformed("redirect_url", e.to_string()))?;

            let client = BasicClient::new(ClientId::new(self.client_id.clone()))
                .set_auth_uri(auth_url)
                .set_redirect_uri(redirect_url);

            let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
            let (url, state) = client
                .authorize_url(CsrfToken::new_random)
                .add_scopes(self.scopes.iter().cloned().map(Scope::new))
                .set_pkce_challenge(pkce_challenge)
                .add_extra_param("resource", self.resource.clone())
                .url();

            Ok(AuthorizationRequest {
                url,
                state: state.secret().clone(),
                code_verifier: SecretString::new(pkce_verifier.secret().clone()),
            })
        }
    }
}

#[cfg(feature = "oauth2")]
pub use authorize::AuthorizationRequest;

/// Runs discovery and client identification for MCP servers
#[derive(Debug, Clone)]
pub struct AuthorizationPlanner {
    config: OAuthConfig,
    resource_fetcher: ResourceMetadataFetcher,
    discovery: DiscoveryFetcher,
    metadata_fetcher: MetadataFetcher,
    transport: ReqwestTransport,
    registration_token: Option<SecretString>,
}

impl AuthorizationPlanner {
    /// Create a planner for a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if OAuth is not enabled, or an
    /// error if the configuration is invalid or an HTTP client cannot be
    /// built.
    pub fn new(config: OAuthConfig) -> AuthResult<Self> {
        if !config.enabled {
            return Err(AuthError::configuration(
                "OAuth is disabled; set enabled = true to plan authorization",
            ));
        }
        config.validate()?;
        Ok(Self {
            config,
            resource_fetcher: ResourceMetadataFetcher::new()?,
            discovery: DiscoveryFetcher::new()?,
            metadata_fetcher: MetadataFetcher::new()?,
            transport: ReqwestTransport::new()?,
            registration_token: None,
        })
    }

    /// Initial access token for Dynamic Client Registration
    #[must_use]
    pub fn with_registration_token(mut self, token: SecretString) -> Self {
        self.registration_token = Some(token);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Plan authorization against the MCP server at `server_url`
    ///
    /// # Errors
    ///
    /// - malformed or insecure server URL
    /// - authorization server discovery failure
    /// - PKCE policy violation
    /// - inconsistent client metadata document
    /// - registration required but not possible or rejected
    pub async fn plan(
        &self,
        server_url: &str,
        requested_scopes: &[String],
    ) -> AuthResult<AuthorizationPlan> {
        let server = validate_secure_url(server_url, "MCP server URL")?;
        let resource = canonical_resource_uri(server_url)?;

        let resource_metadata = match self.resource_fetcher.discover(server_url).await {
            Ok(metadata) => Some(metadata),
            Err(e) if e.is_fallback_eligible() => {
                debug!(server = server_url, error = %e, "No protected resource metadata, using server origin as issuer");
                None
            }
            Err(e) => return Err(e),
        };

        let issuer = resource_metadata
            .as_ref()
            .and_then(ProtectedResourceMetadata::primary_authorization_server)
            .map_or_else(|| origin_of(&server), ToString::to_string);

        let authorization_server = self.discovery.discover(&issuer).await?;
        validate_pkce_support(&authorization_server, self.config.skip_pkce_validation)?;

        let scopes = select_scopes(&self.config, requested_scopes, resource_metadata.as_ref());

        let identification = resolve_client_identification(&self.config);
        let (identification, client_id, client_secret, registration) = match identification {
            ClientIdentification::PreRegistered(id) => (
                ClientIdentification::PreRegistered(id.clone()),
                id,
                self.config.client_secret.clone(),
                None,
            ),
            ClientIdentification::MetadataDocument(url)
                if supports_client_id_metadata(Some(&authorization_server)) =>
            {
                self.metadata_fetcher.validate_consistency(&url).await?;
                (
                    ClientIdentification::MetadataDocument(url.clone()),
                    url,
                    None,
                    None,
                )
            }
            other => {
                if let ClientIdentification::MetadataDocument(url) = &other {
                    warn!(
                        issuer = %authorization_server.issuer,
                        client_id_metadata_url = %url,
                        "Authorization server does not support client ID metadata documents, registering dynamically"
                    );
                }
                let response = self.register(&authorization_server, &scopes).await?;
                (
                    ClientIdentification::DynamicRegistration,
                    response.client_id.clone(),
                    response.client_secret.clone(),
                    Some(response),
                )
            }
        };

        info!(
            server = server_url,
            issuer = %authorization_server.issuer,
            client_id = %client_id,
            scopes = ?scopes,
            "Authorization plan ready"
        );

        Ok(AuthorizationPlan {
            resource,
            resource_metadata,
            authorization_server,
            identification,
            client_id,
            client_secret,
            registration,
            scopes,
            redirect_url: self.config.redirect_url.clone(),
            authorization_timeout: self.config.authorization_timeout(),
        })
    }

    async fn register(
        &self,
        authorization_server: &AuthorizationServerMetadata,
        scopes: &[String],
    ) -> AuthResult<RegistrationResponse> {
        let endpoint = authorization_server
            .registration_endpoint
            .as_deref()
            .ok_or_else(|| {
                AuthError::configuration(format!(
                    "no client_id configured and authorization server {} offers no registration endpoint",
                    authorization_server.issuer
                ))
            })?;

        let client = DcrClient::with_transport(
            endpoint,
            self.registration_token.clone(),
            self.transport.clone(),
        )?;
        client
            .register(&RegistrationRequest::for_public_client(&self.config, scopes))
            .await
    }
}
