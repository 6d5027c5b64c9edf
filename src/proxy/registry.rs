//! Service tag to base URL lookup.

use std::collections::HashMap;
use tracing::error;

use crate::core::config::ServicesConfig;
use crate::core::error::{GatewayError, GatewayResult};

/// Immutable map from service tag (`auth`, `order`, ...) to base URL
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, String>,
}

impl ServiceRegistry {
    pub fn from_config(config: &ServicesConfig) -> Self {
        let services = config
            .iter()
            .map(|(tag, url)| (tag.to_ascii_lowercase(), url.trim_end_matches('/').to_string()))
            .collect();
        Self { services }
    }

    /// Base URL for `tag`; tags are matched case-insensitively
    pub fn resolve(&self, tag: &str) -> GatewayResult<&str> {
        self.services
            .get(&tag.to_ascii_lowercase())
            .map(String::as_str)
            .ok_or_else(|| {
                error!(service = %tag, "No base URL registered for service");
                GatewayError::unknown_service(tag)
            })
    }
}
