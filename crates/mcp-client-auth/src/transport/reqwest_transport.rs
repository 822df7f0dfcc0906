//! Base transport service backed by reqwest

use std::task::{Context, Poll};
use std::time::Duration;

use tower::Service;

use super::{HttpRequest, HttpResponse, TransportFuture};
use crate::error::{AuthError, AuthResult};
use crate::fetch::{DEFAULT_REQUEST_TIMEOUT, MAX_DISCOVERY_RESPONSE_SIZE, build_client, user_agent};

/// Tower service that sends requests with a hardened reqwest client
///
/// TLS 1.2 minimum, redirects not followed, bounded timeout, and response
/// bodies capped at 1 MiB.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    max_response_size: usize,
}

impl ReqwestTransport {
    /// Create a transport with the default 10 second timeout
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn new() -> AuthResult<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with a custom timeout
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails
    pub fn with_timeout(timeout: Duration) -> AuthResult<Self> {
        Ok(Self::from_client(build_client(timeout, &user_agent())?))
    }

    /// Wrap an existing client
    ///
    /// The client should be built with `redirect::Policy::none()`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            max_response_size: MAX_DISCOVERY_RESPONSE_SIZE,
        }
    }

    async fn execute(
        client: reqwest::Client,
        max_response_size: usize,
        request: HttpRequest,
    ) -> AuthResult<HttpResponse> {
        let url = request.uri().to_string();
        let (parts, body) = request.into_parts();

        let mut response = client
            .request(parts.method, &url)
            .headers(parts.headers)
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::network(&url, e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AuthError::network(&url, format!("Failed to read response: {e}")))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() >= max_response_size {
                return Err(AuthError::protocol(
                    &url,
                    format!("response body reached the {max_response_size} byte limit"),
                ));
            }
        }

        let mut http_response = http::Response::new(bytes);
        *http_response.status_mut() = status;
        *http_response.headers_mut() = headers;
        Ok(http_response)
    }
}

impl Service<HttpRequest> for ReqwestTransport {
    type Response = HttpResponse;
    type Error = AuthError;
    type Future = TransportFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        Box::pin(Self::execute(
            self.client.clone(),
            self.max_response_size,
            request,
        ))
    }
}
