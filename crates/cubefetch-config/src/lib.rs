//! Settings for the cubefetch fetch layer.
//!
//! A [`FetchConfig`] describes one SPARQL endpoint plus how requests to it
//! are batched, cached and logged. [`ConfigLoader`] assembles it from
//! `~/.cubefetch/config.toml`, then `.cubefetch/config.toml` in the working
//! directory, then [`ConfigOverrides`] from the command line.

mod error;
mod loader;

pub use error::{ConfigError, FileOp};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};

/// Default number of identifiers per remote query.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default cap on simultaneous batch queries.
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 8;

/// Default SPARQL endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "https://lindas.admin.ch/query";

/// Root configuration for cubefetch.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FetchConfig {
    /// SPARQL endpoint configuration
    pub endpoint: EndpointConfig,

    /// Batching and concurrency configuration
    pub batch: BatchConfig,

    /// Result cache configuration
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// SPARQL endpoint settings.
///
/// # Example TOML
///
/// ```toml
/// [endpoint]
/// url = "https://lindas.admin.ch/query"
/// operation = "post-urlencoded"
/// timeout_secs = 30
/// max_retries = 2
///
/// [endpoint.auth]
/// username = "reader"
/// password_env = "CUBEFETCH_PASSWORD"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Query endpoint URL
    pub url: String,

    /// How queries are sent to the endpoint
    pub operation: QueryOperation,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retry attempts for transient failures
    pub max_retries: u32,

    /// Custom User-Agent header
    pub user_agent: Option<String>,

    /// Authentication (optional)
    pub auth: Option<AuthConfig>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT_URL.to_string(),
            operation: QueryOperation::default(),
            timeout_secs: 30,
            max_retries: 2,
            user_agent: None,
            auth: None,
        }
    }
}

/// SPARQL 1.1 protocol operation used to submit a query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum QueryOperation {
    /// HTTP GET with `?query=` parameter
    Get,
    /// HTTP POST with a form-encoded body (default)
    #[default]
    PostUrlencoded,
    /// HTTP POST with `application/sparql-query` body
    PostDirect,
}

impl std::fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::PostUrlencoded => write!(f, "post-urlencoded"),
            Self::PostDirect => write!(f, "post-direct"),
        }
    }
}

impl std::str::FromStr for QueryOperation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post-urlencoded" | "post_urlencoded" | "posturlencoded" | "post" => {
                Ok(Self::PostUrlencoded)
            }
            "post-direct" | "post_direct" | "postdirect" => Ok(Self::PostDirect),
            _ => Err(ConfigError::invalid_value(
                "endpoint.operation",
                format!(
                    "unknown operation '{}'. Valid values: get, post-urlencoded, post-direct",
                    s
                ),
            )),
        }
    }
}

/// Endpoint credentials.
///
/// Secrets are never stored in the file; only the name of the environment
/// variable holding them.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    /// Basic auth user name
    pub username: Option<String>,

    /// Environment variable containing the basic auth password
    pub password_env: Option<String>,

    /// Environment variable containing a bearer token
    pub token_env: Option<String>,
}

/// Batching and concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchConfig {
    /// Identifiers per remote query
    pub batch_size: usize,

    /// Maximum batch queries in flight at once (0 = unbounded)
    pub max_concurrent_batches: usize,

    /// Share one remote call between concurrent identical queries
    pub coalesce: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            coalesce: true,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache implementation
    pub kind: CacheKind,

    /// Maximum entries (only used by `lru`)
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: CacheKind::default(),
            capacity: 1024,
        }
    }
}

/// Cache implementation selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// No memoization, every fetch hits the endpoint
    None,
    /// Unbounded in-memory map (default)
    #[default]
    Memory,
    /// Entry-count bounded LRU
    Lru,
}

impl std::fmt::Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Memory => write!(f, "memory"),
            Self::Lru => write!(f, "lru"),
        }
    }
}

impl std::str::FromStr for CacheKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "memory" => Ok(Self::Memory),
            "lru" => Ok(Self::Lru),
            _ => Err(ConfigError::invalid_value(
                "cache.kind",
                format!("unknown cache kind '{}'. Valid values: none, memory, lru", s),
            )),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override endpoint URL
    pub endpoint_url: Option<String>,

    /// Override query operation
    pub operation: Option<QueryOperation>,

    /// Override batch size
    pub batch_size: Option<usize>,

    /// Override concurrency cap
    pub max_concurrent_batches: Option<usize>,

    /// Override cache kind
    pub cache_kind: Option<CacheKind>,
}

impl FetchConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref url) = overrides.endpoint_url {
            self.endpoint.url = url.clone();
        }

        if let Some(operation) = overrides.operation {
            self.endpoint.operation = operation;
        }

        if let Some(batch_size) = overrides.batch_size {
            self.batch.batch_size = batch_size;
        }

        if let Some(max) = overrides.max_concurrent_batches {
            self.batch.max_concurrent_batches = max;
        }

        if let Some(kind) = overrides.cache_kind {
            self.cache.kind = kind;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.url.trim().is_empty() {
            return Err(ConfigError::invalid_value("endpoint.url", "is required"));
        }
        if !self.endpoint.url.starts_with("http://") && !self.endpoint.url.starts_with("https://")
        {
            return Err(ConfigError::invalid_value(
                "endpoint.url",
                format!("'{}' is not an http(s) URL", self.endpoint.url),
            ));
        }
        if self.endpoint.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "endpoint.timeout_secs",
                "must be at least 1",
            ));
        }
        if self.batch.batch_size == 0 {
            return Err(ConfigError::invalid_value(
                "batch.batch_size",
                "must be at least 1",
            ));
        }
        if self.cache.kind == CacheKind::Lru && self.cache.capacity == 0 {
            return Err(ConfigError::invalid_value(
                "cache.capacity",
                "lru cache needs a capacity of at least 1",
            ));
        }
        if let Some(ref auth) = self.endpoint.auth {
            if auth.password_env.is_some() && auth.username.is_none() {
                return Err(ConfigError::invalid_value(
                    "endpoint.auth.username",
                    "required when endpoint.auth.password_env is set",
                ));
            }
        }
        Ok(())
    }
}
