//! # HTTP Server Module
//!
//! Wires the gateway together: local status endpoints, local token validation,
//! the upload forwarder, and a fallback that proxies everything else to the owning service. Every request
//! passes through the same stack, outermost first:
//!
//! ```text
//! request id → TraceLayer → CORS → body limit → route authorizer → handler
//! ```
//!
//! CORS sits outside the authorizer so preflight requests never need a token.
//!
//! ## Rust Concepts Used
//!
//! - `AppState` is `Clone` and holds only `Arc`s, so each request gets a cheap copy
//! - `Result<T, T::Rejection>` extractors turn axum rejections into gateway errors
//! - `tokio::select!` bounds how long graceful shutdown may wait for in-flight requests

use axum::{
    extract::{multipart::MultipartRejection, rejection::BytesRejection, DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    middleware,
    response::Response,
    routing::{get, post},
    Extension, Router as AxumRouter,
};
use bytes::Bytes;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::auth::middleware::{authorize_request, RouteAuthorizer};
use crate::auth::token::TokenCodec;
use crate::core::config::{CorsConfig, GatewayConfig};
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::{AuthenticatedUser, ProxiedRequest};
use crate::gateway::health::{api_health, api_info, health_check, readiness_check};
use crate::gateway::validate::{validate_token, VALIDATE_PATH};
use crate::middleware::cors::cors_layer;
use crate::middleware::request_id::{request_span, MakeCorrelationId};
use crate::proxy::forward::ReverseProxy;
use crate::proxy::registry::ServiceRegistry;
use crate::proxy::upload::{UploadForwarder, UploadedFile, UPLOAD_PATH};
use crate::routing::access::RoutePolicy;
use crate::routing::router::ServiceRouter;

/// Service tag that receives uploads
const UPLOAD_SERVICE: &str = "foods";

/// Shared, immutable per-process state
#[derive(Debug, Clone)]
pub struct AppState {
    pub authorizer: Arc<RouteAuthorizer>,
    pub routes: Arc<ServiceRouter>,
    pub proxy: ReverseProxy,
    pub uploads: UploadForwarder,
    pub max_body_size: usize,
}

impl AppState {
    pub fn new(
        authorizer: RouteAuthorizer,
        routes: ServiceRouter,
        proxy: ReverseProxy,
        max_body_size: usize,
    ) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
            routes: Arc::new(routes),
            uploads: UploadForwarder::new(proxy.clone()),
            proxy,
            max_body_size,
        }
    }

    /// State with the standard policy and route tables
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let codec = TokenCodec::from_config(&config.jwt)?;
        let authorizer = RouteAuthorizer::new(Arc::new(RoutePolicy::standard()), Arc::new(codec));

        let registry = ServiceRegistry::from_config(&config.services);
        let client = ReverseProxy::build_client(&config.server)?;
        let proxy = ReverseProxy::new(client, Arc::new(registry));

        Ok(Self::new(
            authorizer,
            ServiceRouter::standard(),
            proxy,
            config.server.max_body_size,
        ))
    }
}

/// Build the gateway application
pub fn build_router(state: AppState, cors: &CorsConfig) -> AxumRouter {
    let body_limit = state.max_body_size;
    let authorizer = state.authorizer.clone();

    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/api/health", get(api_health))
        .route("/api/info", get(api_info))
        .route(VALIDATE_PATH, get(validate_token).fallback(proxy_request))
        .route(UPLOAD_PATH, post(upload_file).fallback(proxy_request))
        .fallback(proxy_request)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeCorrelationId))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(cors))
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(middleware::from_fn_with_state(authorizer, authorize_request))
                .into_inner(),
        )
        .with_state(state)
}

/// Forward any request without a local handler to the service owning its path
async fn proxy_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    user: Option<Extension<AuthenticatedUser>>,
    body: Result<Bytes, BytesRejection>,
) -> GatewayResult<Response> {
    let path = uri.path();
    let route = state
        .routes
        .resolve(path)
        .ok_or_else(|| GatewayError::route_not_found(path))?;

    if let Some(Extension(user)) = &user {
        debug!(user_id = user.user_id, role = %user.role, service = %route.service, "Proxying for user");
    }

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge {
                limit: state.max_body_size,
            }
        } else {
            GatewayError::validation("body", rejection.body_text())
        }
    })?;

    let request = ProxiedRequest::new(method, route.path, uri.query().map(str::to_string), headers, body);
    state.proxy.forward(request, route.service).await
}

/// Re-post the `file` field of a multipart upload to the foods service
async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> GatewayResult<Response> {
    let multipart = multipart.map_err(|rejection| GatewayError::validation("multipart", rejection.body_text()))?;
    let file = UploadedFile::from_multipart(multipart, state.max_body_size).await?;
    state.uploads.forward(file, &headers, UPLOAD_SERVICE).await
}

/// The gateway HTTP server
pub struct GatewayServer {
    config: GatewayConfig,
    app: AxumRouter,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let state = AppState::from_config(&config)?;
        let app = build_router(state, &config.cors);
        Ok(Self { config, app })
    }

    pub fn app(&self) -> AxumRouter {
        self.app.clone()
    }

    pub fn bind_addr(&self) -> String {
        self.config.server.listen_addr()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    ///
    /// Draining is bounded by `server.shutdown_timeout`.
    pub async fn run<F>(self, shutdown: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| GatewayError::internal(format!("Failed to bind gateway server to {}: {}", bind_addr, e)))?;

        info!(
            address = %bind_addr,
            services = self.config.services.iter().count(),
            "Gateway HTTP server listening"
        );

        let draining = Arc::new(Notify::new());
        let signal_draining = draining.clone();
        let server = axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutdown signal received, draining in-flight requests");
                signal_draining.notify_one();
            })
            .into_future();

        let drain_timeout = self.config.server.shutdown_timeout;
        let deadline = async move {
            draining.notified().await;
            tokio::time::sleep(drain_timeout).await;
        };

        tokio::select! {
            result = server => {
                result.map_err(|e| GatewayError::internal(format!("Gateway server error: {}", e)))?;
                info!("Gateway server stopped");
            }
            _ = deadline => {
                warn!(timeout = ?drain_timeout, "Shutdown timed out, dropping remaining connections");
            }
        }

        Ok(())
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ServicesConfig;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.jwt.secret = "server-test-secret-long-enough-for-hmac".to_string();
        config.services = ServicesConfig::default();
        config
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GatewayServer::new(test_config()).unwrap();
        assert_eq!(server.bind_addr(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_short_secret_fails_server_creation() {
        let mut config = test_config();
        config.jwt.secret = "short".to_string();
        assert!(GatewayServer::new(config).is_err());
    }

    #[tokio::test]
    async fn test_health_is_served_locally() {
        let app = GatewayServer::new(test_config()).unwrap().app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unrouted_path_is_not_found_after_auth() {
        let state = AppState::from_config(&test_config()).unwrap();
        let token = state.authorizer.codec().encode("eve", crate::core::types::Role::Customer, 5).unwrap();
        let app = build_router(state, &CorsConfig::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/payments/1")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
