//! # Route Access Policy
//!
//! An ordered table of (path pattern, method filter, access requirement) rules.
//! The first rule matching the request wins; a path no rule matches requires an
//! authenticated caller.
//!
//! Patterns use two forms:
//! - `/api/foods/upload` matches that exact path only
//! - `/api/auth/**` matches `/api/auth` and everything below it

use axum::http::Method;
use std::fmt;

use crate::core::types::Role;
use crate::routing::matches_prefix;

/// What a caller must present to use a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No credentials needed
    Public,
    /// Any valid bearer token
    Authenticated,
    /// A valid bearer token carrying this role
    Role(Role),
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => write!(f, "public"),
            Access::Authenticated => write!(f, "authenticated"),
            Access::Role(role) => write!(f, "role {}", role),
        }
    }
}

/// Path pattern of an access rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some(prefix) => PathPattern::Prefix(prefix.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact || path.strip_suffix('/') == Some(exact.as_str()),
            PathPattern::Prefix(prefix) => matches_prefix(path, prefix),
        }
    }
}

/// A single row of the policy table
#[derive(Debug, Clone)]
pub struct AccessRule {
    pub pattern: PathPattern,
    /// `None` matches every method
    pub methods: Option<Vec<Method>>,
    pub access: Access,
}

impl AccessRule {
    pub fn new(pattern: &str, access: Access) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            methods: None,
            access,
        }
    }

    /// Restrict the rule to the given methods
    pub fn for_methods(mut self, methods: &[Method]) -> Self {
        self.methods = Some(methods.to_vec());
        self
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        let method_ok = self
            .methods
            .as_ref()
            .map_or(true, |methods| methods.contains(method));
        method_ok && self.pattern.matches(path)
    }
}

/// Ordered access policy evaluated once per request
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    rules: Vec<AccessRule>,
    default_access: Access,
}

impl RoutePolicy {
    /// Create a policy whose unmatched paths require authentication
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self {
            rules,
            default_access: Access::Authenticated,
        }
    }

    /// The food delivery platform's route table
    pub fn standard() -> Self {
        let read = [Method::GET, Method::HEAD];
        let customer = Access::Role(Role::Customer);
        let restaurant = Access::Role(Role::Restaurant);

        Self::new(vec![
            AccessRule::new("/api/auth/**", Access::Public),
            AccessRule::new("/health", Access::Public),
            AccessRule::new("/ready", Access::Public),
            AccessRule::new("/api/health", Access::Public),
            AccessRule::new("/api/info", Access::Public),
            AccessRule::new("/api/foods/upload", Access::Public),
            AccessRule::new("/api/foods/uploads/**", Access::Public),
            AccessRule::new("/api/order/**", customer),
            AccessRule::new("/api/orders/**", customer),
            // Customers browse the menu; only restaurants change it.
            AccessRule::new("/api/foods/**", Access::Authenticated).for_methods(&read),
            AccessRule::new("/api/foods/**", restaurant),
            AccessRule::new("/api/restaurants/**", restaurant),
            AccessRule::new("/api/inventory/**", restaurant),
            AccessRule::new("/api/user/**", Access::Authenticated),
            AccessRule::new("/api/users/**", Access::Authenticated),
        ])
    }

    /// Access requirement for a request
    pub fn access_for(&self, method: &Method, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.access)
            .unwrap_or(self.default_access)
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::standard()
    }
}
