//! # Reverse Proxy Core
//!
//! Forwards a captured request to the service that owns its path and relays the
//! answer back verbatim. One attempt per request: no retries, no caching.
//! Upstream 4xx and 5xx responses are relayed like any other; only transport
//! failures (refused connections, DNS, timeouts, truncated bodies) turn into a
//! gateway-generated 503.
//!
//! ## Rust Concepts Used
//!
//! - `reqwest::Client` is an `Arc` internally, so cloning the proxy shares one pool
//! - `std::error::Error::source` walks the transport error chain for the message

use axum::{
    body::Body,
    http::{header, Method},
    response::Response,
};
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::config::ServerConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::ProxiedRequest;
use crate::proxy::headers::relay_headers;
use crate::proxy::registry::ServiceRegistry;

/// HTTP reverse proxy over a shared connection pool
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    client: reqwest::Client,
    registry: Arc<ServiceRegistry>,
}

impl ReverseProxy {
    pub fn new(client: reqwest::Client, registry: Arc<ServiceRegistry>) -> Self {
        Self { client, registry }
    }

    /// Outbound client honoring the server's timeouts
    ///
    /// Redirects are relayed to the caller rather than followed, and proxy
    /// environment variables are ignored since backends are on the internal network.
    pub fn build_client(config: &ServerConfig) -> GatewayResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {}", e)))
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Absolute upstream URL for `path_and_query` on `service`
    pub fn target_url(&self, service: &str, path_and_query: &str) -> GatewayResult<String> {
        let base = self.registry.resolve(service)?;
        Ok(format!("{}{}", base, path_and_query))
    }

    /// Forward `request` to `service` and relay its response
    pub async fn forward(&self, request: ProxiedRequest, service: &str) -> GatewayResult<Response> {
        let url = self.target_url(service, &request.path_and_query())?;
        debug!(service = %service, method = %request.method, target = %url, "Forwarding request");

        let method = request.method.clone();
        let upstream = self
            .client
            .request(request.method, &url)
            .headers(relay_headers(&request.headers))
            .body(request.body)
            .send()
            .await
            .map_err(|e| transport_failure(service, &url, &e))?;

        relay_response(&method, service, &url, upstream).await
    }
}

/// Build the client-facing response from an upstream one
///
/// Status, body bytes and every end-to-end header value pass through unchanged.
/// Hop-by-hop headers describe the upstream connection, not ours, and are dropped;
/// the server sets `content-length` again for the buffered body. A HEAD response
/// has no body to measure, so its upstream `content-length` is kept.
/// The body is read fully, so a connection cut mid-body is still a transport failure.
pub(crate) async fn relay_response(
    method: &Method,
    service: &str,
    url: &str,
    upstream: reqwest::Response,
) -> GatewayResult<Response> {
    let status = upstream.status();
    let mut headers = relay_headers(upstream.headers());
    if *method == Method::HEAD {
        if let Some(length) = upstream.headers().get(header::CONTENT_LENGTH) {
            headers.insert(header::CONTENT_LENGTH, length.clone());
        }
    }
    let body = upstream
        .bytes()
        .await
        .map_err(|e| transport_failure(service, url, &e))?;

    debug!(service = %service, target = %url, status = status.as_u16(), "Upstream responded");

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

pub(crate) fn transport_failure(service: &str, url: &str, err: &reqwest::Error) -> GatewayError {
    let cause = describe_error(err);
    warn!(service = %service, target = %url, timeout = err.is_timeout(), "Upstream unavailable: {}", cause);
    GatewayError::upstream_unavailable(service, cause)
}

/// The error message followed by each of its sources
fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
