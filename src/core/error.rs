//! # Error Handling Module
//!
//! Every failure the gateway produces itself is a [`GatewayError`]. Each variant maps
//! to exactly one HTTP status at the boundary through [`IntoResponse`], so handlers
//! and middleware return `GatewayResult<T>` and let axum render the error.
//!
//! ## What is NOT an error here
//!
//! A backend answering 4xx/5xx is a successful exchange from the gateway's point of
//! view: the proxy relays that response verbatim and never builds a `GatewayError`
//! for it. The only fabricated upstream error is [`GatewayError::UpstreamUnavailable`],
//! used when no response was obtained at all.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::token::InvalidToken;

/// Main result type used throughout the gateway
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error taxonomy for the gateway
///
/// The `#[error("...")]` strings are the `message` field of the JSON error body.
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    /// Configuration-related errors (invalid config file, bad values, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Missing, malformed, invalid or expired bearer token
    #[error("{reason}")]
    Authentication { reason: String },

    /// Valid token whose role does not satisfy the route
    #[error("{reason}")]
    Authorization { reason: String },

    /// A route names a service tag the registry does not know
    #[error("Unknown service type: {service}")]
    UnknownService { service: String },

    /// No service route handles this path
    #[error("No route for path: {path}")]
    RouteNotFound { path: String },

    /// No response was obtained from the upstream service
    #[error("{reason}")]
    UpstreamUnavailable { service: String, reason: String },

    /// Request validation errors (malformed multipart body, missing fields, etc.)
    #[error("{field}: {reason}")]
    RequestValidation { field: String, reason: String },

    /// Inbound body exceeds the configured limit
    #[error("Request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Internal server errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// Configuration file that is not valid YAML or does not fit the schema
    #[error("Failed to parse config: {message}")]
    Yaml { message: String },
}

impl GatewayError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an authentication error with a custom reason
    pub fn auth<S: Into<String>>(reason: S) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// Create an authorization error with a custom reason
    pub fn authz<S: Into<String>>(reason: S) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    pub fn unknown_service<S: Into<String>>(service: S) -> Self {
        Self::UnknownService {
            service: service.into(),
        }
    }

    pub fn route_not_found<S: Into<String>>(path: S) -> Self {
        Self::RouteNotFound { path: path.into() }
    }

    /// Create an upstream-unavailable error
    pub fn upstream_unavailable<S: Into<String>, R: Into<String>>(service: S, reason: R) -> Self {
        Self::UpstreamUnavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error for a named request field
    pub fn validation<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::RequestValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Self::Authorization { .. } => StatusCode::FORBIDDEN,
            Self::UnknownService { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::RequestValidation { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used as the `error` field of the JSON body
    pub fn label(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "Unauthorized",
            Self::Authorization { .. } => "Forbidden",
            Self::UnknownService { .. } => "Unknown service",
            Self::RouteNotFound { .. } => "Not found",
            Self::UpstreamUnavailable { .. } => "Service unavailable",
            Self::RequestValidation { .. } => "Bad request",
            Self::PayloadTooLarge { .. } => "Payload too large",
            Self::Configuration { .. } | Self::Yaml { .. } => "Configuration error",
            Self::Internal { .. } => "Internal server error",
        }
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

impl From<InvalidToken> for GatewayError {
    fn from(err: InvalidToken) -> Self {
        Self::Authentication {
            reason: err.to_string(),
        }
    }
}

/// Render the error as `{"error": <label>, "message": <detail>}`
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.label(),
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
