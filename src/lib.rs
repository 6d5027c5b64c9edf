//! # Food Gateway
//!
//! The single public entry point of the food delivery platform. The gateway
//! authorizes each request from its bearer token and path, then forwards it to
//! the backend service that owns the path (auth, order, foods, inventory or
//! restaurant) and relays the answer back unchanged.
//!
//! ## Module Layout
//!
//! - `core`: error type, configuration, request-scoped types
//! - `auth`: token codec and the route authorization middleware
//! - `routing`: access policy table and service route table
//! - `proxy`: service registry, header relay, reverse proxy, upload forwarder
//! - `middleware`: CORS and request correlation ids
//! - `observability`: structured logging
//! - `gateway`: axum server wiring and local status endpoints

/// Error type, configuration and shared request types
pub mod core;

/// Bearer token handling and per-route authorization
pub mod auth;

/// Which paths need which credentials, and which service owns each path
pub mod routing;

/// Forwarding requests and uploads to backend services
pub mod proxy;

pub mod middleware;

pub mod observability;

/// HTTP server and local endpoints
pub mod gateway;

pub use core::config::GatewayConfig;
pub use core::error::{GatewayError, GatewayResult};
pub use core::types::{AuthenticatedUser, ProxiedRequest, Role};

pub use auth::{RouteAuthorizer, TokenCodec};
pub use gateway::server::{build_router, AppState, GatewayServer};
pub use proxy::{ReverseProxy, ServiceRegistry, UploadForwarder};
pub use routing::{RoutePolicy, ServiceRouter};
