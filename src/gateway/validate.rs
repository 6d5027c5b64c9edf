//! `GET /api/auth/validate`, answered by the gateway from the token alone.
//!
//! The route is public in the access table, so the authorizer lets every caller
//! through and this handler reports the verdict in the `/api/*` envelope.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::debug;

use crate::auth::middleware::extract_bearer;
use crate::core::types::AuthenticatedUser;
use crate::gateway::health::ApiEnvelope;
use crate::gateway::server::AppState;

pub const VALIDATE_PATH: &str = "/api/auth/validate";

pub async fn validate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<ApiEnvelope<AuthenticatedUser>>) {
    let verdict = extract_bearer(&headers)
        .map_err(|e| e.to_string())
        .and_then(|token| state.authorizer.codec().decode(token).map_err(|e| e.to_string()));

    match verdict {
        Ok(claims) => {
            let user = claims.into_user();
            let message = format!("Token is valid for user: {} with role: {}", user.username, user.role);
            (StatusCode::OK, Json(ApiEnvelope::success(message, user)))
        }
        Err(reason) => {
            debug!(reason = %reason, "Token validation failed");
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiEnvelope::error("Invalid or expired token", reason)),
            )
        }
    }
}
