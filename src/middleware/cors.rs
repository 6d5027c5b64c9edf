//! CORS layer built from [`CorsConfig`].
//!
//! `tower_http` refuses to combine credentials with a literal `*`, so when
//! credentials are allowed a wildcard list mirrors whatever the request asked for.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::core::config::CorsConfig;

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|value| value.trim() == "*")
}

/// Parse each entry, skipping (and logging) the ones that are not valid
fn parse_all<T, F>(kind: &str, values: &[String], parse: F) -> Vec<T>
where
    F: Fn(&str) -> Option<T>,
{
    values
        .iter()
        .filter_map(|value| {
            let parsed = parse(value.trim());
            if parsed.is_none() {
                warn!("Ignoring invalid CORS {} entry: {}", kind, value);
            }
            parsed
        })
        .collect()
}

pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let credentials = config.allow_credentials;

    let origins = if is_wildcard(&config.allowed_origins) {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        }
    } else {
        AllowOrigin::list(parse_all("origin", &config.allowed_origins, |v| {
            HeaderValue::from_str(v).ok()
        }))
    };

    let methods = if is_wildcard(&config.allowed_methods) {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::any()
        }
    } else {
        AllowMethods::list(parse_all("method", &config.allowed_methods, |v| {
            Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
        }))
    };

    let headers = if is_wildcard(&config.allowed_headers) {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::any()
        }
    } else {
        AllowHeaders::list(parse_all("header", &config.allowed_headers, |v| {
            HeaderName::from_bytes(v.as_bytes()).ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials)
        .max_age(config.max_age)
}
