//! Configuration for the fetch engine
//!
//! Everything here can be loaded from YAML; every field has a default, so an
//! empty document is a valid configuration. The access token is deliberately
//! absent: it travels in each [`FetchContext`](crate::types::FetchContext).

use crate::error::{Error, Result, ResultExt};
use crate::http::{check_accept_encoding, HttpClientConfig, RateLimiterConfig};
use crate::retry::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Root directory of the response cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./stargazer_cache")
}

impl FetchConfig {
    /// Create a new config builder
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::default()
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .config_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::config("cache_dir must not be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts must be at least 1"));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(Error::config(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms",
            ));
        }
        check_accept_encoding(&self.http.accept_encoding)?;
        if let Some(rate_limit) = &self.http.rate_limit {
            if rate_limit.requests_per_second == 0 {
                return Err(Error::config(
                    "http.rate_limit.requests_per_second must be at least 1",
                ));
            }
        }
        Ok(())
    }

    /// Executor configuration derived from this config
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http.timeout_seconds),
            user_agent: self.http.user_agent.clone(),
            accept_encoding: self.http.accept_encoding.clone(),
            rate_limit: self.http.rate_limit,
        }
    }

    /// Backoff policy derived from this config
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            rate_limit_padding: Duration::from_millis(self.retry.rate_limit_padding_ms),
        }
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// `Accept-Encoding` sent with every request
    #[serde(default = "default_accept_encoding")]
    pub accept_encoding: String,

    /// Client-side pacing per access token; absent means unpaced
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            accept_encoding: default_accept_encoding(),
            rate_limit: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("stargazers-fetch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_accept_encoding() -> String {
    "gzip".to_string()
}

// ============================================================================
// Retry Config
// ============================================================================

/// Retry and backoff settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Network attempts per fetch
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First transient-failure wait in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_backoff_ms: u64,

    /// Longest transient-failure wait in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_backoff_ms: u64,

    /// Padding added to a quota reset time in milliseconds
    #[serde(default = "default_padding_ms")]
    pub rate_limit_padding_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_ms(),
            max_backoff_ms: default_max_ms(),
            rate_limit_padding_ms: default_padding_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_ms() -> u64 {
    50
}

fn default_max_ms() -> u64 {
    1000
}

fn default_padding_ms() -> u64 {
    1000
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`FetchConfig`]
#[derive(Default)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    /// Set the cache root
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.http.user_agent = agent.into();
        self
    }

    /// Set the request timeout in seconds
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.http.timeout_seconds = seconds;
        self
    }

    /// Enable client-side pacing
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.http.rate_limit = Some(config);
        self
    }

    /// Set attempts per fetch
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    /// Set the backoff bounds in milliseconds
    pub fn backoff_ms(mut self, initial: u64, max: u64) -> Self {
        self.config.retry.initial_backoff_ms = initial;
        self.config.retry.max_backoff_ms = max;
        self
    }

    /// Build and validate the config
    pub fn build(self) -> Result<FetchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
