//! Shared fixtures: a gateway wired to wiremock upstreams, and token helpers.

#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use chrono::Utc;
use food_gateway::auth::token::Claims;
use food_gateway::core::config::{GatewayConfig, ServicesConfig};
use food_gateway::{build_router, AppState, Role, TokenCodec};
use std::time::Duration;
use wiremock::MockServer;

pub const SECRET: &str = "integration-test-secret-with-plenty-of-bytes";

pub const UNREACHABLE: &str = "http://127.0.0.1:1";

/// One mock server per backend service
pub struct Upstreams {
    pub auth: MockServer,
    pub order: MockServer,
    pub foods: MockServer,
    pub inventory: MockServer,
    pub restaurant: MockServer,
}

impl Upstreams {
    pub async fn start() -> Self {
        Self {
            auth: MockServer::start().await,
            order: MockServer::start().await,
            foods: MockServer::start().await,
            inventory: MockServer::start().await,
            restaurant: MockServer::start().await,
        }
    }

    pub fn services(&self) -> ServicesConfig {
        let mut services = ServicesConfig::empty();
        services.insert("auth", self.auth.uri());
        services.insert("order", self.order.uri());
        services.insert("foods", self.foods.uri());
        services.insert("inventory", self.inventory.uri());
        services.insert("restaurant", self.restaurant.uri());
        services
    }

    pub fn config(&self) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.jwt.secret = SECRET.to_string();
        config.services = self.services();
        config.server.request_timeout = Duration::from_secs(5);
        config.server.connect_timeout = Duration::from_secs(1);
        config
    }
}

pub fn router_for(config: &GatewayConfig) -> axum::Router {
    let state = AppState::from_config(config).expect("valid gateway config");
    build_router(state, &config.cors)
}

pub fn server_for(config: &GatewayConfig) -> TestServer {
    TestServer::new(router_for(config)).expect("test server")
}

pub fn codec() -> TokenCodec {
    TokenCodec::new(SECRET, Duration::from_secs(3600)).expect("codec")
}

pub fn token(role: Role, user_id: i64) -> String {
    codec().encode("tester", role, user_id).expect("token")
}

pub fn expired_token(role: Role, user_id: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: "tester".to_string(),
        role,
        user_id,
        iat: now - 7200,
        exp: now - 60,
    };
    codec().encode_claims(&claims).expect("token")
}

pub fn authorization() -> HeaderName {
    HeaderName::from_static("authorization")
}

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).expect("header value")
}
