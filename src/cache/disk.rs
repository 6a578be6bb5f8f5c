//! File-backed response cache
//!
//! Layout: `<root>/<owner>/<repo>/<host>/<stem>-<digest>.json`. The stem is a
//! readable rendering of the URL path and query, the digest disambiguates
//! identities that render to the same stem (or differ only by `Accept`).
//! Records are written to a temp file first, then renamed into place.

use super::{CacheEntry, CacheRecord, ResponseCache};
use crate::error::{Error, Result};
use crate::types::{validate_scope, RequestIdentity};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

const MAX_STEM_LEN: usize = 96;
const DIGEST_LEN: usize = 16;

/// Response cache persisted as JSON files under a root directory
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Create a cache rooted at `root`; directories are created lazily
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding every entry of the given repository scope
    pub fn scope_dir(&self, scope: &str) -> Result<PathBuf> {
        validate_scope(scope)?;
        Ok(self.root.join(scope))
    }

    /// File an identity's entry is stored in
    pub fn entry_path(&self, identity: &RequestIdentity) -> Result<PathBuf> {
        let (host, stem) = match Url::parse(&identity.url) {
            Ok(url) => {
                let host = match (url.host_str(), url.port()) {
                    (Some(host), Some(port)) => format!("{host}_{port}"),
                    (Some(host), None) => host.to_string(),
                    (None, _) => "_".to_string(),
                };
                let mut stem = url.path().trim_start_matches('/').to_string();
                if let Some(query) = url.query() {
                    stem.push('?');
                    stem.push_str(query);
                }
                (host, stem)
            }
            Err(_) => ("_".to_string(), identity.url.clone()),
        };

        let digest = identity.digest();
        let file = format!("{}-{}.json", sanitize(&stem), &digest[..DIGEST_LEN]);
        Ok(self.scope_dir(&identity.scope)?.join(sanitize(&host)).join(file))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::cache_io("invalidate", path, e)),
        }
    }
}

#[async_trait]
impl ResponseCache for DiskCache {
    async fn get(&self, identity: &RequestIdentity) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(identity)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(url = %identity.url, "cache miss");
                return Ok(None);
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(url = %identity.url, path = %path.display(), "cache record is not UTF-8; removing");
                self.remove_file(&path).await?;
                return Ok(None);
            }
            Err(e) => return Err(Error::cache_io("read", &path, e)),
        };

        match serde_json::from_str::<CacheRecord>(&contents) {
            Ok(record) if record.request == *identity => {
                debug!(url = %identity.url, "cache hit");
                Ok(Some(record.entry))
            }
            Ok(record) => {
                warn!(
                    url = %identity.url,
                    stored = %record.request,
                    "cache record answers a different request; ignoring"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(url = %identity.url, path = %path.display(), "corrupt cache record ({e}); removing");
                self.remove_file(&path).await?;
                Ok(None)
            }
        }
    }

    async fn put(&self, identity: &RequestIdentity, entry: &CacheEntry) -> Result<()> {
        let path = self.entry_path(identity)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::cache_io("write", parent, e))?;
        }

        let record = CacheRecord {
            request: identity.clone(),
            entry: entry.clone(),
        };
        let contents = serde_json::to_string_pretty(&record)?;

        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, contents)
            .await
            .map_err(|e| Error::cache_io("write", &temp_path, e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| Error::cache_io("write", &path, e))?;

        debug!(url = %identity.url, path = %path.display(), "cached response");
        Ok(())
    }

    async fn invalidate(&self, identity: &RequestIdentity) -> Result<()> {
        let path = self.entry_path(identity)?;
        self.remove_file(&path).await
    }

    async fn clear_scope(&self, scope: &str) -> Result<()> {
        let dir = self.scope_dir(scope)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!(scope, dir = %dir.display(), "cleared cached responses");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(scope, "no cached responses to clear");
                Ok(())
            }
            Err(e) => Err(Error::cache_io("clear", &dir, e)),
        }
    }
}

/// Make a URL fragment safe as a single file name component
fn sanitize(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '=' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();
    if out.is_empty() || out.chars().all(|c| c == '.') {
        out = "index".to_string();
    }
    out
}
