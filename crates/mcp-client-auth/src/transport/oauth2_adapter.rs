//! Adapter between tower transport stacks and the `oauth2` crate
//!
//! The `oauth2` crate sends its token requests through an `AsyncHttpClient`.
//! [`OAuth2HttpClient`] implements that trait for any service in this module,
//! so token requests pick up the resource indicator middleware.
//! [`OAuth2CodeExchanger`] uses it to implement
//! [`TokenExchanger`](crate::flow::TokenExchanger).

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use oauth2::basic::BasicClient;
use oauth2::{
    AsyncHttpClient, AuthorizationCode, ClientId, ClientSecret, PkceCodeVerifier, RedirectUrl,
    TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};
use tower::{Service, ServiceExt};
use tracing::debug;

use super::{HttpRequest, HttpResponse};
use crate::error::{AuthError, AuthResult};
use crate::flow::{TokenExchangeRequest, TokenExchanger, TokenSet};

/// `oauth2::AsyncHttpClient` backed by a tower service
#[derive(Debug, Clone)]
pub struct OAuth2HttpClient<S> {
    inner: S,
}

impl<S> OAuth2HttpClient<S> {
    /// Wrap a transport stack
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Get a reference to the wrapped service
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<'c, S> AsyncHttpClient<'c> for OAuth2HttpClient<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = AuthError> + Clone + Send + Sync + 'c,
    S::Future: Send,
{
    type Error = AuthError;
    type Future = BoxFuture<'c, Result<HttpResponse, AuthError>>;

    fn call(&'c self, request: HttpRequest) -> Self::Future {
        let service = self.inner.clone();
        Box::pin(async move { service.oneshot(request).await })
    }
}

/// Authorization-code exchanger built on the `oauth2` crate
///
/// The exchange request is sent through the wrapped transport, so wrapping a
/// [`ResourceService`](super::ResourceService) adds the `resource` parameter
/// to the token request body.
#[derive(Debug, Clone)]
pub struct OAuth2CodeExchanger<S> {
    http: OAuth2HttpClient<S>,
}

impl<S> OAuth2CodeExchanger<S> {
    /// Create an exchanger that sends requests through `transport`
    pub fn new(transport: S) -> Self {
        Self {
            http: OAuth2HttpClient::new(transport),
        }
    }
}

#[async_trait]
impl<S> TokenExchanger for OAuth2CodeExchanger<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = AuthError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
{
    async fn exchange(&self, request: TokenExchangeRequest) -> AuthResult<TokenSet> {
        let token_url = TokenUrl::new(request.token_endpoint.clone())
            .map_err(|e| AuthError::malformed("token_endpoint", e.to_string()))?;
        let redirect_url = RedirectUrl::new(request.redirect_url.clone())
            .map_err(|e| AuthError::malformed("redirect_url", e.to_string()))?;

        let mut client = BasicClient::new(ClientId::new(request.client_id.clone()))
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);
        if let Some(secret) = &request.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.expose_secret().clone()));
        }

        debug!(token_endpoint = %request.token_endpoint, "Exchanging authorization code");

        let response = client
            .exchange_code(AuthorizationCode::new(request.code.expose_secret().clone()))
            .set_pkce_verifier(PkceCodeVerifier::new(
                request.code_verifier.expose_secret().clone(),
            ))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                AuthError::protocol(&request.token_endpoint, format!("token exchange failed: {e}"))
            })?;

        Ok(TokenSet {
            access_token: SecretString::new(response.access_token().secret().clone()),
            token_type: response.token_type().as_ref().to_string(),
            expires_in: response.expires_in(),
            refresh_token: response
                .refresh_token()
                .map(|token| SecretString::new(token.secret().clone())),
            scopes: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
        })
    }
}
