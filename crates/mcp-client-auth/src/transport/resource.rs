//! RFC 8707 resource indicator middleware

use std::sync::Arc;
use std::task::{Context, Poll};

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use http::uri::{PathAndQuery, Uri};
use tower::{Layer, Service};
use tracing::trace;
use url::form_urlencoded;

use super::{HttpRequest, HttpResponse, TransportFuture, canonical_resource_uri};
use crate::error::{AuthError, AuthResult};

const RESOURCE_PARAM: &str = "resource";
const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Layer that adds a `resource` parameter to every request
///
/// Form-encoded request bodies (token requests) get the parameter in the
/// body; everything else gets it in the query string. An existing `resource`
/// parameter is replaced.
#[derive(Debug, Clone)]
pub struct ResourceLayer {
    resource: Arc<str>,
}

impl ResourceLayer {
    /// Create a layer for the given resource URI
    ///
    /// # Errors
    ///
    /// See [`canonical_resource_uri`].
    pub fn new(resource_uri: &str) -> AuthResult<Self> {
        Ok(Self {
            resource: canonical_resource_uri(resource_uri)?.into(),
        })
    }

    /// The canonical resource URI injected into requests
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl<S> Layer<S> for ResourceLayer {
    type Service = ResourceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResourceService {
            inner,
            resource: Arc::clone(&self.resource),
        }
    }
}

/// Service produced by [`ResourceLayer`]
#[derive(Debug, Clone)]
pub struct ResourceService<S> {
    inner: S,
    resource: Arc<str>,
}

impl<S> ResourceService<S> {
    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> Service<HttpRequest> for ResourceService<S>
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
        let req = match add_resource(req, &self.resource) {
            Ok(req) => req,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);
        Box::pin(async move { inner.call(req).await })
    }
}

fn add_resource(mut req: HttpRequest, resource: &str) -> AuthResult<HttpRequest> {
    if is_form_body(&req) {
        let body = with_resource(req.body(), resource);
        let len = HeaderValue::from(body.len());
        *req.body_mut() = body;
        req.headers_mut().insert(CONTENT_LENGTH, len);
        trace!(uri = %req.uri(), "Added resource indicator to form body");
    } else {
        let query = with_resource(req.uri().query().unwrap_or_default().as_bytes(), resource);
        *req.uri_mut() = with_query(req.uri(), &query)?;
        trace!(uri = %req.uri(), "Added resource indicator to query");
    }

    Ok(req)
}

fn is_form_body(req: &HttpRequest) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().starts_with(FORM_MEDIA_TYPE))
}

/// Re-encode `encoded` without any `resource` pair, then append ours
fn with_resource(encoded: &[u8], resource: &str) -> Vec<u8> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(encoded) {
        if key != RESOURCE_PARAM {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.append_pair(RESOURCE_PARAM, resource);
    serializer.finish().into_bytes()
}

fn with_query(uri: &Uri, query: &[u8]) -> AuthResult<Uri> {
    let path_and_query = format!("{}?{}", uri.path(), String::from_utf8_lossy(query));

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| AuthError::malformed("request URI", e.to_string()))?,
    );
    Uri::from_parts(parts).map_err(|e| AuthError::malformed("request URI", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    const RESOURCE: &str = "https://mcp.example.com/mcp";

    type Seen = Arc<Mutex<Option<HttpRequest>>>;

    fn recorder() -> (
        Seen,
        impl Service<HttpRequest, Response = HttpResponse, Error = AuthError, Future: Send>
        + Clone
        + Send
        + 'static,
    ) {
        let seen: Seen = Arc::default();
        let captured = Arc::clone(&seen);
        let svc = service_fn(move |req: HttpRequest| {
            let captured = Arc::clone(&captured);
            async move {
                *captured.lock().unwrap() = Some(req);
                Ok::<_, AuthError>(http::Response::new(b"ok".to_vec()))
            }
        });
        (seen, svc)
    }

    #[tokio::test]
    async fn test_query_parameter_added() {
        let (seen, inner) = recorder();
        let svc = ServiceBuilder::new()
            .layer(ResourceLayer::new(RESOURCE).unwrap())
            .service(inner);

        let req = http::Request::get("https://auth.example.com/authorize?client_id=abc&state=xyz")
            .body(Vec::new())
            .unwrap();
        let response = svc.oneshot(req).await.unwrap();
        assert_eq!(response.body(), b"ok");

        let req = seen.lock().unwrap().take().unwrap();
        assert_eq!(
            req.uri().query(),
            Some("client_id=abc&state=xyz&resource=https%3A%2F%2Fmcp.example.com%2Fmcp")
        );
    }

    #[tokio::test]
    async fn test_existing_resource_overwritten() {
        let (seen, inner) = recorder();
        let svc = ResourceLayer::new(RESOURCE).unwrap().layer(inner);

        let req = http::Request::get("https://auth.example.com/authorize?resource=https%3A%2F%2Fevil.example.com")
            .body(Vec::new())
            .unwrap();
        svc.oneshot(req).await.unwrap();

        let req = seen.lock().unwrap().take().unwrap();
        let pairs: Vec<_> = form_urlencoded::parse(req.uri().query().unwrap().as_bytes())
            .into_owned()
            .collect();
        assert_eq!(pairs, vec![("resource".to_string(), RESOURCE.to_string())]);
    }

    #[tokio::test]
    async fn test_form_body_parameter_added() {
        let (seen, inner) = recorder();
        let svc = ResourceLayer::new(RESOURCE).unwrap().layer(inner);

        let req = http::Request::post("https://auth.example.com/token")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(b"grant_type=authorization_code&code=xyz".to_vec())
            .unwrap();
        svc.oneshot(req).await.unwrap();

        let req = seen.lock().unwrap().take().unwrap();
        let body = String::from_utf8(req.body().clone()).unwrap();
        assert_eq!(
            body,
            "grant_type=authorization_code&code=xyz&resource=https%3A%2F%2Fmcp.example.com%2Fmcp"
        );
        assert_eq!(req.uri().query(), None);
        assert_eq!(
            req.headers()[CONTENT_LENGTH].to_str().unwrap(),
            body.len().to_string()
        );
    }

    #[tokio::test]
    async fn test_json_body_uses_query() {
        let (seen, inner) = recorder();
        let svc = ResourceLayer::new(RESOURCE).unwrap().layer(inner);

        let req = http::Request::post("https://auth.example.com/register")
            .header(CONTENT_TYPE, "application/json")
            .body(b"{}".to_vec())
            .unwrap();
        svc.oneshot(req).await.unwrap();

        let req = seen.lock().unwrap().take().unwrap();
        assert_eq!(req.body(), b"{}");
        assert!(req.uri().query().unwrap().starts_with("resource="));
    }

    #[test]
    fn test_layer_canonicalises_resource() {
        let layer = ResourceLayer::new("HTTPS://MCP.EXAMPLE.COM/mcp/").unwrap();
        assert_eq!(layer.resource(), RESOURCE);
        assert!(ResourceLayer::new("http://mcp.example.com").is_err());
    }
}
