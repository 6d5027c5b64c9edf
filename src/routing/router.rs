//! # Service Router Module
//!
//! Maps an inbound path to the backend service that owns it. Routes are tried in
//! declaration order and compared on path-segment boundaries, so `/api/order`
//! never captures `/api/orders`. A route can rewrite its prefix before the
//! request is forwarded, which lets the plural `/api/orders/**` alias reach the
//! order service's singular `/api/order/**` endpoints.
//!
//! ## Rust Concepts Used
//!
//! - A builder with by-value `self` methods gives the fluent table declaration
//! - `RouteMatch<'a>` borrows the service tag from the router instead of cloning it

use crate::routing::matches_prefix;

/// One row of the service route table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoute {
    /// Path prefix, matched on segment boundaries
    pub prefix: String,

    /// Service tag resolved through the registry
    pub service: String,

    /// Replacement for `prefix` in the forwarded path
    pub rewrite: Option<String>,
}

impl ServiceRoute {
    pub fn new(prefix: &str, service: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            service: service.to_string(),
            rewrite: None,
        }
    }

    pub fn with_rewrite(mut self, replacement: &str) -> Self {
        self.rewrite = Some(replacement.trim_end_matches('/').to_string());
        self
    }

    pub fn matches(&self, path: &str) -> bool {
        matches_prefix(path, &self.prefix)
    }

    /// Path to send upstream for a path this route matched
    pub fn forward_path(&self, path: &str) -> String {
        match &self.rewrite {
            Some(replacement) => {
                let rest = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);
                format!("{}{}", replacement, rest)
            }
            None => path.to_string(),
        }
    }
}

/// Result of resolving a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub service: &'a str,
    /// Path after any prefix rewrite
    pub path: String,
}

/// Ordered prefix router
#[derive(Debug, Clone, Default)]
pub struct ServiceRouter {
    routes: Vec<ServiceRoute>,
}

impl ServiceRouter {
    pub fn new(routes: Vec<ServiceRoute>) -> Self {
        Self { routes }
    }

    pub fn builder() -> ServiceRouterBuilder {
        ServiceRouterBuilder::default()
    }

    /// The platform's route table
    pub fn standard() -> Self {
        Self::builder()
            .route("/api/auth", "auth")
            .route("/api/user", "auth")
            .route("/api/users", "auth")
            .rewrite("/api/orders", "order", "/api/order")
            .route("/api/order", "order")
            .route("/api/foods", "foods")
            .route("/api/inventory", "inventory")
            .route("/api/restaurants", "restaurant")
            .build()
    }

    /// Find the owning service for `path`; `None` if no route matches
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .map(|route| RouteMatch {
                service: route.service.as_str(),
                path: route.forward_path(path),
            })
    }
}

/// Builder for declaring route tables fluently
#[derive(Debug, Default)]
pub struct ServiceRouterBuilder {
    routes: Vec<ServiceRoute>,
}

impl ServiceRouterBuilder {
    /// Forward `prefix/**` unchanged to `service`
    pub fn route(mut self, prefix: &str, service: &str) -> Self {
        self.routes.push(ServiceRoute::new(prefix, service));
        self
    }

    /// Forward `prefix/**` to `service` with `prefix` replaced by `replacement`
    pub fn rewrite(mut self, prefix: &str, service: &str, replacement: &str) -> Self {
        self.routes
            .push(ServiceRoute::new(prefix, service).with_rewrite(replacement));
        self
    }

    pub fn build(self) -> ServiceRouter {
        ServiceRouter::new(self.routes)
    }
}
