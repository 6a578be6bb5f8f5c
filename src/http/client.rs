//! HTTP executor
//!
//! Sends one GET per call and turns whatever happens into a [`FetchOutcome`]:
//! - Fixed headers (user agent, accept-encoding, bearer token, `Accept`)
//! - Optional client-side pacing per access token
//! - Transport failures become `Transient`, never an `Err`

use super::outcome::{classify, FetchOutcome};
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{Error, Result};
use crate::types::{FetchContext, HeaderMapping, RequestIdentity};
use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_ENCODING};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP executor
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// `Accept-Encoding` value sent with every request
    pub accept_encoding: String,
    /// Client-side pacing, keyed by access token
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("stargazers-fetch/{}", env!("CARGO_PKG_VERSION")),
            accept_encoding: "gzip".to_string(),
            rate_limit: None,
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP executor config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the `Accept-Encoding` value
    pub fn accept_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.config.accept_encoding = encoding.into();
        self
    }

    /// Enable client-side pacing
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Performs single network attempts
pub struct HttpExecutor {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpExecutor {
    /// Create an executor with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        check_accept_encoding(&config.accept_encoding)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Share a limiter with other executors using the same tokens
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Executor configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Check if client-side pacing is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Perform one GET of `identity.url` and classify the result
    pub async fn execute(&self, ctx: &FetchContext, identity: &RequestIdentity) -> FetchOutcome {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait(ctx.token.as_deref()).await;
        }

        let mut req = self
            .client
            .get(&identity.url)
            .header(ACCEPT_ENCODING, self.config.accept_encoding.as_str());
        if let Some(ref token) = ctx.token {
            req = req.bearer_auth(token);
        }
        if let Some(ref accept) = identity.accept {
            req = req.header(ACCEPT, accept.as_str());
        }

        debug!(url = %identity.url, "fetching");
        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::transient(format!("request failed: {e}")),
        };

        let status = response.status().as_u16();
        let headers = header_mapping(response.headers());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return FetchOutcome::transient(format!(
                    "failed to read body of HTTP {status} response: {e}"
                ))
            }
        };

        classify(identity, status, headers, body)
    }
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Content codings the client can decode; anything else would hand
/// compressed bytes to the JSON decoder
const DECODABLE_ENCODINGS: &[&str] = &["gzip", "identity"];

/// Reject an `Accept-Encoding` value naming a coding the client cannot decode
pub(crate) fn check_accept_encoding(value: &str) -> Result<()> {
    let mut codings = value
        .split(',')
        .map(|item| item.split(';').next().unwrap_or_default().trim());
    let decodable = codings.all(|coding| {
        DECODABLE_ENCODINGS
            .iter()
            .any(|known| coding.eq_ignore_ascii_case(known))
    });
    if value.trim().is_empty() || !decodable {
        return Err(Error::config(format!(
            "unsupported Accept-Encoding {value:?}; expected one of {}",
            DECODABLE_ENCODINGS.join(", ")
        )));
    }
    Ok(())
}

/// Flatten response headers; repeated headers are joined with ", "
fn header_mapping(headers: &HeaderMap) -> HeaderMapping {
    let mut out = HeaderMapping::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        out.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}
