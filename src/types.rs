//! Common types used throughout the fetch engine
//!
//! Request identity and the per-call fetch context live here because the
//! cache, the executor and the orchestrator all consume them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};

// ============================================================================
// Type Aliases
// ============================================================================

/// Response headers keyed by lower-cased name
pub type HeaderMapping = BTreeMap<String, String>;

/// URL of the next page of a paginated collection; `None` once the last page
/// has been reached
pub type PageCursor = Option<String>;

// ============================================================================
// Media Types
// ============================================================================

/// Preview media type that adds `starred_at` timestamps to stargazer listings
pub const STAR_MEDIA_TYPE: &str = "application/vnd.github.v3.star+json";

// ============================================================================
// Fetch Context
// ============================================================================

/// Per-call fetch configuration
///
/// Built fresh at each call site and never mutated afterwards. Call sites
/// that need a content-negotiation override derive a new context with
/// [`FetchContext::with_accept`].
#[derive(Clone, PartialEq, Eq)]
pub struct FetchContext {
    /// Tracked repository (`owner/repo`), used to namespace cache entries
    pub repo: String,
    /// Access token sent as a bearer credential
    pub token: Option<String>,
    /// Optional `Accept` header override
    pub accept: Option<String>,
}

impl FetchContext {
    /// Create a context for the given repository
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            token: None,
            accept: None,
        }
    }

    /// Return a copy carrying the given access token
    #[must_use]
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    /// Return a copy carrying the given `Accept` override
    #[must_use]
    pub fn with_accept(&self, accept: impl Into<String>) -> Self {
        Self {
            accept: Some(accept.into()),
            ..self.clone()
        }
    }

    /// Return a copy with the `Accept` override removed
    #[must_use]
    pub fn without_accept(&self) -> Self {
        Self {
            accept: None,
            ..self.clone()
        }
    }
}

impl fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchContext")
            .field("repo", &self.repo)
            .field("has_token", &self.token.is_some())
            .field("accept", &self.accept)
            .finish()
    }
}

/// Check that `scope` names exactly one repository (`owner/repo`)
///
/// Scopes become cache directories, so a scope with one part or three parts
/// would nest inside (or around) another repository's entries.
pub fn validate_scope(scope: &str) -> Result<()> {
    let mut parts = scope.split('/');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) => is_scope_part(owner) && is_scope_part(repo),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::config(format!(
            "invalid repository scope {scope:?}; expected owner/repo"
        )))
    }
}

fn is_scope_part(part: &str) -> bool {
    let mut components = Path::new(part).components();
    !part.contains('\\')
        && matches!(components.next(), Some(Component::Normal(name)) if name == part)
        && components.next().is_none()
}

// ============================================================================
// Request Identity
// ============================================================================

/// The key a cached response is addressed by
///
/// Two requests share an identity only when they would return the same
/// representation: same method, same URL, same `Accept` override. `scope`
/// places the identity under its tracked repository so a repository's entries
/// can be cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestIdentity {
    /// Tracked repository (`owner/repo`)
    pub scope: String,
    /// HTTP method
    pub method: String,
    /// Absolute request URL
    pub url: String,
    /// `Accept` override, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
}

impl RequestIdentity {
    /// Identity of a GET of `url` under `ctx`
    pub fn get(ctx: &FetchContext, url: &str) -> Self {
        Self {
            scope: ctx.repo.clone(),
            method: "GET".to_string(),
            url: url.to_string(),
            accept: ctx.accept.clone(),
        }
    }

    /// Stable hex digest over method, URL and `Accept` override
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_bytes());
        hasher.update(b"\n");
        if let Some(accept) = &self.accept {
            hasher.update(accept.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)?;
        if let Some(accept) = &self.accept {
            write!(f, " (accept: {accept})")?;
        }
        Ok(())
    }
}
