//! # Core Types Module
//!
//! Request-scoped data shared between the authorizer, the proxy and the handlers.
//! Nothing here outlives a single inbound request.

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role carried in the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Restaurant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Restaurant => "RESTAURANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Role::Customer),
            "RESTAURANT" => Ok(Role::Restaurant),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Identity of an authorized caller
///
/// Inserted into the request extensions by the route authorizer; downstream
/// handlers read it with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

/// An inbound request captured for forwarding
///
/// The body is read fully before forwarding; `Bytes` keeps clones cheap.
#[derive(Debug, Clone)]
pub struct ProxiedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxiedRequest {
    pub fn new(method: Method, path: impl Into<String>, query: Option<String>, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            path: path.into(),
            query: query.filter(|q| !q.is_empty()),
            headers,
            body,
        }
    }

    /// Path and query as they will appear after the service base URL
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
        assert_eq!("RESTAURANT".parse::<Role>(), Ok(Role::Restaurant));
        assert!("ADMIN".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_uses_upper_case() {
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"CUSTOMER\"");
        let role: Role = serde_json::from_str("\"RESTAURANT\"").unwrap();
        assert_eq!(role, Role::Restaurant);
    }

    #[test]
    fn test_path_and_query() {
        let request = ProxiedRequest::new(
            Method::GET,
            "/api/foods",
            Some("page=2&size=10".to_string()),
            HeaderMap::new(),
            Bytes::new(),
        );
        assert_eq!(request.path_and_query(), "/api/foods?page=2&size=10");

        let request = ProxiedRequest::new(Method::GET, "/api/foods", Some(String::new()), HeaderMap::new(), Bytes::new());
        assert_eq!(request.path_and_query(), "/api/foods");
    }
}
