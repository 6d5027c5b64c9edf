//! # Route Authorization Middleware
//!
//! Decides, per request, whether the caller may proceed. The decision is made
//! from the method, the path and the `Authorization` header alone, before any
//! body is read and before any upstream is contacted:
//!
//! ```text
//! UNCHECKED ──► PUBLIC
//!     └──────► AUTH_REQUIRED ──► AUTHORIZED   (user inserted into extensions)
//!                    └─────────► REJECTED     (401 / 403, request ends here)
//! ```
//!
//! ## Rust Concepts Used
//!
//! - `axum::middleware::from_fn_with_state` turns an async fn into a layer
//! - Request extensions carry the `AuthenticatedUser` to the handlers

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::token::TokenCodec;
use crate::core::error::GatewayError;
use crate::core::types::AuthenticatedUser;
use crate::routing::access::{Access, RoutePolicy};
use crate::routing::has_dot_segment;

/// Outcome of authorizing one request
#[derive(Debug, Clone)]
pub enum AuthDecision {
    /// The route is public; no credentials were examined
    Public,
    /// The caller presented a valid token that satisfies the route
    Authorized(AuthenticatedUser),
    /// The request must be answered with this error
    Rejected(GatewayError),
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AuthDecision::Rejected(_))
    }
}

/// Applies a [`RoutePolicy`] using a [`TokenCodec`] to check credentials
#[derive(Debug, Clone)]
pub struct RouteAuthorizer {
    policy: Arc<RoutePolicy>,
    codec: Arc<TokenCodec>,
}

impl RouteAuthorizer {
    pub fn new(policy: Arc<RoutePolicy>, codec: Arc<TokenCodec>) -> Self {
        Self { policy, codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn authorize(&self, method: &Method, path: &str, headers: &HeaderMap) -> AuthDecision {
        if has_dot_segment(path) {
            return AuthDecision::Rejected(GatewayError::validation(
                "path",
                "dot segments are not allowed",
            ));
        }

        let access = self.policy.access_for(method, path);
        if access == Access::Public {
            return AuthDecision::Public;
        }

        let user = match extract_bearer(headers)
            .and_then(|token| self.codec.decode(token).map_err(GatewayError::from))
        {
            Ok(claims) => claims.into_user(),
            Err(err) => return AuthDecision::Rejected(err),
        };

        match access {
            Access::Role(required) if user.role != required => {
                AuthDecision::Rejected(GatewayError::authz(format!(
                    "Access denied: requires role {}",
                    required
                )))
            }
            _ => AuthDecision::Authorized(user),
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively and the token must be non-empty.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, GatewayError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| GatewayError::auth("Missing Authorization header"))?
        .to_str()
        .map_err(|_| GatewayError::auth("Malformed Authorization header"))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| GatewayError::auth("Malformed Authorization header"))?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(GatewayError::auth("Malformed Authorization header"));
    }

    Ok(token)
}

/// Axum middleware running the [`RouteAuthorizer`] in front of every route
pub async fn authorize_request(
    State(authorizer): State<Arc<RouteAuthorizer>>,
    mut request: Request,
    next: Next,
) -> Response {
    let decision = authorizer.authorize(request.method(), request.uri().path(), request.headers());

    match decision {
        AuthDecision::Public => next.run(request).await,
        AuthDecision::Authorized(user) => {
            debug!(user_id = user.user_id, role = %user.role, "Request authorized");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        AuthDecision::Rejected(err) => {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                status = err.status_code().as_u16(),
                "Request rejected: {}",
                err
            );
            err.into_response()
        }
    }
}
