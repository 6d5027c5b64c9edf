//! # Configuration Module
//!
//! Loads the gateway configuration once at startup. The result is immutable for the
//! lifetime of the process and is handed to the components that need it.
//!
//! ## Sources, in order of precedence
//! 1. Environment variables (see [`GatewayConfig::apply_env_overrides`])
//! 2. The YAML file at `GATEWAY_CONFIG_PATH` (default `config/gateway.yaml`)
//! 3. Built-in defaults
//!
//! Validation runs last and reports every problem it finds in a single error.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::core::error::{GatewayError, GatewayResult};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.yaml";

/// Environment variables that override a single service URL, by service tag
const SERVICE_URL_ENV: &[(&str, &str)] = &[
    ("auth", "AUTH_SERVICE_URL"),
    ("order", "ORDER_SERVICE_URL"),
    ("foods", "FOOD_SERVICE_URL"),
    ("inventory", "INVENTORY_SERVICE_URL"),
    ("restaurant", "RESTAURANT_SERVICE_URL"),
];

/// Main gateway configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and timeout settings
    pub server: ServerConfig,

    /// Backend base URLs keyed by service tag (`auth`, `order`, `foods`, ...)
    pub services: ServicesConfig,

    /// Bearer token settings
    pub jwt: JwtConfig,

    /// Cross-origin policy for browser clients
    pub cors: CorsConfig,

    /// Log level and output format
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Load configuration from `path` if it exists, otherwise start from defaults
    ///
    /// Environment overrides are applied and the result is validated either way.
    pub async fn load<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let path = path.as_ref();
        let mut config = if tokio::fs::try_exists(path).await.unwrap_or(false) {
            Self::from_yaml_file(path).await?
        } else {
            tracing::info!(path = %path.display(), "Configuration file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file without applying overrides
    pub async fn from_yaml_file<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> GatewayResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> GatewayResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` as the variable source
    ///
    /// Recognized variables:
    /// - `GATEWAY_SERVER_BIND_ADDRESS`, `GATEWAY_SERVER_PORT` (or `SERVER_PORT`)
    /// - `GATEWAY_SERVER_REQUEST_TIMEOUT`, `GATEWAY_SERVER_MAX_BODY_SIZE`
    /// - `AUTH_SERVICE_URL`, `ORDER_SERVICE_URL`, `FOOD_SERVICE_URL`,
    ///   `INVENTORY_SERVICE_URL`, `RESTAURANT_SERVICE_URL`
    /// - `JWT_SECRET`
    /// - `CORS_ALLOWED_ORIGINS`, `CORS_ALLOWED_METHODS`, `CORS_ALLOWED_HEADERS`,
    ///   `CORS_ALLOW_CREDENTIALS`
    /// - `GATEWAY_LOG_LEVEL`, `GATEWAY_LOG_FORMAT`
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> GatewayResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("GATEWAY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        if let Some(port) = lookup("GATEWAY_SERVER_PORT").or_else(|| lookup("SERVER_PORT")) {
            self.server.port = port
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_SERVER_PORT: {}", e)))?;
        }

        if let Some(timeout) = lookup("GATEWAY_SERVER_REQUEST_TIMEOUT") {
            self.server.request_timeout = humantime::parse_duration(&timeout)
                .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_SERVER_REQUEST_TIMEOUT: {}", e)))?;
        }

        if let Some(size) = lookup("GATEWAY_SERVER_MAX_BODY_SIZE") {
            self.server.max_body_size = size
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_SERVER_MAX_BODY_SIZE: {}", e)))?;
        }

        for (tag, var) in SERVICE_URL_ENV {
            if let Some(url) = lookup(var) {
                self.services.insert(*tag, url);
            }
        }

        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt.secret = secret;
        }

        if let Some(origins) = lookup("CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = split_list(&origins);
        }

        if let Some(methods) = lookup("CORS_ALLOWED_METHODS") {
            self.cors.allowed_methods = split_list(&methods);
        }

        if let Some(headers) = lookup("CORS_ALLOWED_HEADERS") {
            self.cors.allowed_headers = split_list(&headers);
        }

        if let Some(credentials) = lookup("CORS_ALLOW_CREDENTIALS") {
            self.cors.allow_credentials = credentials
                .trim()
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid CORS_ALLOW_CREDENTIALS: {}", e)))?;
        }

        if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("GATEWAY_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate the configuration, collecting every problem
    pub fn validate(&self) -> GatewayResult<()> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be greater than 0".to_string());
        }

        if self.server.bind_address.is_empty() {
            errors.push("server.bind_address cannot be empty".to_string());
        }

        if self.server.max_body_size == 0 {
            errors.push("server.max_body_size must be greater than 0".to_string());
        }

        if self.server.request_timeout.is_zero() {
            errors.push("server.request_timeout must be greater than 0".to_string());
        }

        if self.server.connect_timeout.is_zero() {
            errors.push("server.connect_timeout must be greater than 0".to_string());
        }

        for (tag, url) in self.services.iter() {
            if tag.is_empty() {
                errors.push(format!("services: empty service tag for '{}'", url));
                continue;
            }
            match Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {}
                Ok(parsed) => errors.push(format!(
                    "services.{}: unsupported URL '{}' (scheme '{}')",
                    tag,
                    url,
                    parsed.scheme()
                )),
                Err(e) => errors.push(format!("services.{}: invalid URL '{}': {}", tag, url, e)),
            }
        }

        if self.jwt.secret.len() < MIN_SECRET_LEN {
            errors.push(format!(
                "jwt.secret must be at least {} bytes (set JWT_SECRET)",
                MIN_SECRET_LEN
            ));
        }

        if self.jwt.token_ttl.is_zero() {
            errors.push("jwt.token_ttl must be greater than 0".to_string());
        } else if self.jwt.token_ttl > MAX_TOKEN_TTL {
            errors.push(format!(
                "jwt.token_ttl must be at most {}",
                humantime::format_duration(MAX_TOKEN_TTL)
            ));
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::config(errors.join("; ")))
        }
    }
}

/// Minimum HMAC key length for HS256
pub const MIN_SECRET_LEN: usize = 32;

/// Longest lifetime accepted for minted tokens (one year)
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Server listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: String,

    /// HTTP port
    pub port: u16,

    /// Maximum inbound request body size in bytes (uploads included)
    pub max_body_size: usize,

    /// Upper bound on a single upstream exchange
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Upper bound on establishing an upstream connection
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// How long in-flight requests may run after a shutdown signal
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 10 * 1024 * 1024, // 10MB
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Backend base URLs keyed by service tag
///
/// Tags are stored lower-cased and URLs without trailing slashes, whichever way
/// an entry arrives. A later insert for the same tag replaces the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServicesConfig(HashMap<String, String>);

impl ServicesConfig {
    /// A map with no services registered
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(&normalize_tag(tag)).map(String::as_str)
    }

    pub fn insert(&mut self, tag: impl AsRef<str>, url: impl AsRef<str>) {
        self.0.insert(normalize_tag(tag.as_ref()), normalize_url(url.as_ref()));
    }

    pub fn remove(&mut self, tag: &str) -> Option<String> {
        self.0.remove(&normalize_tag(tag))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// Rejects two spellings of one tag (`Order` and `order`) in the same map
impl<'de> Deserialize<'de> for ServicesConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = HashMap::<String, String>::deserialize(deserializer)?;
        let mut services = Self::empty();
        for (tag, url) in raw {
            let normalized = normalize_tag(&tag);
            if services.0.contains_key(&normalized) {
                return Err(de::Error::custom(format!(
                    "duplicate service tag '{}' (tags are case-insensitive)",
                    normalized
                )));
            }
            services.0.insert(normalized, normalize_url(&url));
        }
        Ok(services)
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_ascii_lowercase()
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

impl Default for ServicesConfig {
    fn default() -> Self {
        let services = [
            ("auth", "http://localhost:8081"),
            ("order", "http://localhost:8082"),
            ("foods", "http://localhost:8083"),
            ("inventory", "http://localhost:8084"),
            ("restaurant", "http://localhost:8085"),
        ];

        let mut config = Self::empty();
        for (tag, url) in services {
            config.insert(tag, url);
        }
        config
    }
}

/// Bearer token configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Shared HMAC signing secret; must match the auth service
    pub secret: String,

    /// Lifetime of tokens minted by [`crate::auth::TokenCodec::encode`]
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// CORS configuration
///
/// A single `"*"` entry in any list means "any".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Max age for preflight responses
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://localhost:8080".to_string(),
            ],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_headers: vec!["*".to_string()],
            allow_credentials: true,
            max_age: Duration::from_secs(3600),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,

    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "food_gateway=info,tower_http=info".to_string(),
            format: "json".to_string(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn valid_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.jwt.secret = SECRET.to_string();
        config
    }

    #[test]
    fn test_defaults_need_only_a_secret() {
        assert!(GatewayConfig::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_yaml_parsing_with_partial_sections() {
        let yaml = r#"
server:
  port: 9000
  request_timeout: 5s
services:
  order: http://orderservice:8082/
jwt:
  secret: "0123456789abcdef0123456789abcdef"
"#;
        let config = GatewayConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.request_timeout, Duration::from_secs(5));
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.services.get("order"), Some("http://orderservice:8082"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = valid_config();
        let env: HashMap<&str, &str> = [
            ("SERVER_PORT", "9191"),
            ("ORDER_SERVICE_URL", "http://orders.internal:80"),
            ("FOOD_SERVICE_URL", "http://foods.internal:80"),
            ("CORS_ALLOWED_ORIGINS", "https://app.example.com, https://admin.example.com"),
            ("CORS_ALLOW_CREDENTIALS", "false"),
            ("GATEWAY_SERVER_REQUEST_TIMEOUT", "2s"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9191);
        assert_eq!(config.services.get("order"), Some("http://orders.internal:80"));
        assert_eq!(config.services.get("foods"), Some("http://foods.internal:80"));
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert!(!config.cors.allow_credentials);
        assert_eq!(config.server.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_env_override_is_reported() {
        let mut config = valid_config();
        let err = config
            .apply_overrides_from(|key| (key == "GATEWAY_SERVER_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("GATEWAY_SERVER_PORT"));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.server.port = 0;
        config.services.insert("order", "ftp://orders");
        config.services.insert("foods", "not a url");
        config.logging.format = "xml".to_string();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("server.port"));
        assert!(message.contains("services.order"));
        assert!(message.contains("services.foods"));
        assert!(message.contains("jwt.secret"));
        assert!(message.contains("logging.format"));
    }

    #[test]
    fn test_inserted_tags_are_lowercased() {
        let mut config = valid_config();
        config.services.insert("Inventory", "http://inventory:8084//");
        assert_eq!(config.services.get("inventory"), Some("http://inventory:8084"));
        assert_eq!(config.services.iter().filter(|(tag, _)| tag.as_str() == "inventory").count(), 1);
    }

    #[test]
    fn test_env_override_replaces_mixed_case_yaml_tag() {
        let env = |key: &str| (key == "ORDER_SERVICE_URL").then(|| "http://from-env:2".to_string());

        for _ in 0..50 {
            let mut config = GatewayConfig::from_yaml_str("services:\n  Order: http://from-yaml:1\n").unwrap();
            config.apply_overrides_from(env).unwrap();

            assert_eq!(config.services.get("order"), Some("http://from-env:2"));
            assert_eq!(config.services.iter().count(), 1);
        }
    }

    #[test]
    fn test_case_insensitive_duplicate_tags_are_rejected() {
        let yaml = "services:\n  Order: http://a:1\n  order: http://b:2\n";
        let err = GatewayConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, GatewayError::Yaml { .. }));
        assert!(err.to_string().contains("duplicate service tag 'order'"));
    }

    #[test]
    fn test_malformed_yaml_is_a_yaml_error() {
        let err = GatewayConfig::from_yaml_str("server: [unclosed").unwrap_err();
        assert!(matches!(err, GatewayError::Yaml { .. }));
        assert_eq!(err.label(), "Configuration error");
    }

    #[test]
    fn test_token_ttl_is_bounded() {
        let mut config = valid_config();
        config.jwt.token_ttl = Duration::from_secs(u64::MAX);
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("jwt.token_ttl must be at most"));

        config.jwt.token_ttl = MAX_TOKEN_TTL;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = valid_config();
        let debug = format!("{:?}", config.jwt);
        assert!(!debug.contains(SECRET));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 7070\njwt:\n  secret: \"{}\"", SECRET).unwrap();

        let config = GatewayConfig::from_yaml_file(file.path()).await.unwrap();
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.jwt.secret, SECRET);
    }
}
