//! Gateway-local status endpoints. None of these contact a backend.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::{json, Value};

const SERVICE_NAME: &str = "food-gateway";

/// Envelope used by the gateway's own `/api/*` endpoints
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T> ApiEnvelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error.into()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Health check handler
pub async fn health_check() -> impl IntoResponse {
    let health_info = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": SERVICE_NAME,
    });

    (StatusCode::OK, Json(health_info))
}

/// Readiness check handler
///
/// The gateway holds no connections of its own, so it is ready once it is serving.
pub async fn readiness_check() -> impl IntoResponse {
    let readiness_info = json!({
        "status": "ready",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    });

    (StatusCode::OK, Json(readiness_info))
}

pub async fn api_health() -> Json<ApiEnvelope<Value>> {
    Json(ApiEnvelope::success(
        "API Gateway is running",
        json!({
            "status": "UP",
            "service": "API Gateway",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    ))
}

pub async fn api_info() -> Json<ApiEnvelope<Value>> {
    Json(ApiEnvelope::success(
        "Success",
        json!({
            "service": "Food Delivery System API Gateway",
            "description": "Central gateway routing requests to the auth, order, food, inventory and restaurant services",
            "version": env!("CARGO_PKG_VERSION"),
            "features": [
                "JWT Authentication",
                "Role-based Authorization",
                "Service Routing",
                "CORS Support",
                "Request Proxying",
            ],
        }),
    ))
}
