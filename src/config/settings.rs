use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::environment::{Endpoints, Environment};
use crate::error::{ClientError, Result};
use crate::utils::constants::{
    DEFAULT_CACHE_DIR, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECONDS, DEFAULT_TOKEN_TTL_SECONDS,
    DEFAULT_TOLERANCE_PERCENT,
};

/// ================================
/// Client-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ClientSettings {
    #[serde(default)]
    pub environment: Environment,
    pub credentials: Credentials,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Overrides the environment's endpoints when set.
    pub endpoints: Option<Endpoints>,
    pub trace: Option<TraceConfig>,
    pub logging: Option<LoggingConfig>,
}

/// OAuth2 client credentials. The secret never shows up in `Debug` output.
#[derive(Deserialize, Clone, Default)]
pub struct Credentials {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), secret: secret.into() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Skip TLS certificate verification. Off unless explicitly enabled.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// 0 disables the cache, 100 reuses the token until the hard TTL.
    /// invariant: <= 100
    #[serde(default = "default_tolerance_percent")]
    pub tolerance_percent: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TraceConfig {
    pub dir: PathBuf,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl ClientSettings {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            environment: Environment::default(),
            credentials,
            http: HttpConfig::default(),
            cache: CacheConfig::default(),
            endpoints: None,
            trace: None,
            logging: None,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Timeouts have whole-second granularity; a partial second rounds up,
    /// so only `Duration::ZERO` yields an invalid (zero) timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let partial = u64::from(timeout.subsec_nanos() > 0);
        self.http.timeout_seconds = timeout.as_secs().saturating_add(partial);
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache.dir = dir.into();
        self
    }

    pub fn with_tolerance_percent(mut self, tolerance_percent: u8) -> Self {
        self.cache.tolerance_percent = tolerance_percent;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl_seconds = ttl.as_secs();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn with_trace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.trace = Some(TraceConfig { dir: dir.into() });
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.http.accept_invalid_certs = accept;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    /// Endpoints in effect: the explicit override, else the environment's.
    pub fn endpoints(&self) -> Endpoints {
        self.endpoints
            .clone()
            .unwrap_or_else(|| self.environment.endpoints())
    }

    pub fn validate(&self) -> Result<()> {
        if self.credentials.client_id.trim().is_empty() {
            return Err(ClientError::MissingCredentials("client id"));
        }
        if self.credentials.secret.trim().is_empty() {
            return Err(ClientError::MissingCredentials("client secret"));
        }
        if self.cache.tolerance_percent > 100 {
            return Err(ClientError::InvalidSettings(format!(
                "cache.tolerance_percent must be within 0..=100, got {}",
                self.cache.tolerance_percent
            )));
        }
        if self.cache.ttl_seconds == 0 {
            return Err(ClientError::InvalidSettings("cache.ttl_seconds must be > 0".to_owned()));
        }
        if self.http.timeout_seconds == 0 {
            return Err(ClientError::InvalidSettings(
                "http.timeout_seconds must be > 0".to_owned(),
            ));
        }
        Ok(())
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

fn default_tolerance_percent() -> u8 {
    DEFAULT_TOLERANCE_PERCENT
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
