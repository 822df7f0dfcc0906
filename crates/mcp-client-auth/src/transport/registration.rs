//! Registration access token middleware
//!
//! Some authorization servers require an initial access token for Dynamic
//! Client Registration (RFC 7591 §3). The token is only ever sent over HTTPS
//! and only to the origin of the registration endpoint the layer was built
//! for. Neither the token nor the `Authorization` header value appears in
//! errors or log output.

use std::sync::Arc;
use std::task::{Context, Poll};

use http::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tower::{Layer, Service};
use tracing::debug;
use url::Url;

use super::{HttpRequest, HttpResponse, TransportFuture};
use crate::error::{AuthError, AuthResult};
use crate::url_policy::{origin_of, validate_secure_url};

/// Layer that attaches a registration bearer token
#[derive(Clone)]
pub struct RegistrationTokenLayer {
    origin: Arc<str>,
    token: Option<Arc<SecretString>>,
}

impl RegistrationTokenLayer {
    /// Scope a layer to the origin of `registration_endpoint`
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is malformed or insecure.
    pub fn new(registration_endpoint: &str, token: Option<SecretString>) -> AuthResult<Self> {
        let endpoint = validate_secure_url(registration_endpoint, "registration_endpoint")?;
        Ok(Self {
            origin: origin_of(&endpoint).into(),
            token: token.map(Arc::new),
        })
    }

    /// Origin this layer is scoped to
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Whether a token is configured
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for RegistrationTokenLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationTokenLayer")
            .field("origin", &self.origin)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl<S> Layer<S> for RegistrationTokenLayer {
    type Service = RegistrationTokenService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RegistrationTokenService {
            inner,
            origin: Arc::clone(&self.origin),
            token: self.token.clone(),
        }
    }
}

/// Service produced by [`RegistrationTokenLayer`]
#[derive(Clone)]
pub struct RegistrationTokenService<S> {
    inner: S,
    origin: Arc<str>,
    token: Option<Arc<SecretString>>,
}

impl<S> RegistrationTokenService<S> {
    fn authorize(&self, mut req: HttpRequest) -> AuthResult<HttpRequest> {
        let Some(token) = &self.token else {
            return Ok(req);
        };

        let url = Url::parse(&req.uri().to_string())
            .map_err(|e| AuthError::malformed("registration request URI", e.to_string()))?;

        if url.scheme() != "https" {
            return Err(AuthError::security(format!(
                "refusing to send registration token over plaintext to {}",
                origin_of(&url)
            )));
        }

        let origin = origin_of(&url);
        if origin != *self.origin {
            return Err(AuthError::security(format!(
                "refusing to send registration token to {origin}, token is scoped to {}",
                self.origin
            )));
        }

        let mut value = HeaderValue::try_from(format!("Bearer {}", token.expose_secret()))
            .map_err(|_| AuthError::configuration("registration token is not a valid header value"))?;
        value.set_sensitive(true);
        req.headers_mut().insert(AUTHORIZATION, value);

        debug!(origin = %origin, "Attached registration token");
        Ok(req)
    }
}

impl<S> std::fmt::Debug for RegistrationTokenService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationTokenService")
            .field("origin", &self.origin)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl<S> Service<HttpRequest> for RegistrationTokenService<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = AuthError> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = HttpResponse;
    type Error = AuthError;
    type Future = TransportFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let req = match self.authorize(req) {
            Ok(req) => req,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);
        Box::pin(async move { inner.call(req).await })
    }
}
