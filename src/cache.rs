//! Local WSDL file cache.
//!
//! One file per WSDL source, named `<prefix><host>-<md5(url)>` inside the
//! cache directory (the platform temp dir unless overridden). Entries are
//! overwritten on every build and never deleted here.

use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::CacheMode;
use crate::error::{ClientError, Result};

/// File name prefix for cache entries.
pub const CACHE_PREFIX: &str = "zentinel_soap_wsdl_cache_";

/// TTL hint used by `set_cache` (360 days).
pub const SOAP_CACHE_TTL: u64 = 31_104_000;

/// Entry limit hint used by `set_cache`.
pub const SOAP_CACHE_LIMIT: usize = 100;

/// Cache-control hints handed to the SOAP engine.
///
/// Scoped to a single build; nothing process-wide is modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WsdlCacheHints {
    pub enabled: bool,
    /// Cache mode discriminator (the TTL value given to `set_cache`)
    pub mode: i64,
    pub ttl_secs: u64,
    pub limit: usize,
}

impl WsdlCacheHints {
    /// Derive hints from the configured cache mode. Disabled caching zeroes
    /// every hint.
    pub fn from_mode(mode: &CacheMode, discriminator: i64) -> Self {
        match *mode {
            CacheMode::None => Self::default(),
            CacheMode::FileTtl {
                ttl_secs,
                max_entries,
            } => Self {
                enabled: true,
                mode: discriminator,
                ttl_secs,
                limit: max_entries,
            },
        }
    }
}

/// Deterministic cache file name for a WSDL source.
pub fn cache_file_name(host: &str, wsdl_source: &str) -> String {
    format!(
        "{}{}-{:x}",
        CACHE_PREFIX,
        host,
        md5::compute(wsdl_source.as_bytes())
    )
}

/// Cache entry for one WSDL source.
#[derive(Debug, Clone)]
pub struct WsdlCache {
    path: PathBuf,
}

impl WsdlCache {
    /// Create the cache entry handle for `wsdl_source` under `dir`.
    pub fn new(dir: &Path, host: &str, wsdl_source: &str) -> Self {
        Self {
            path: dir.join(cache_file_name(host, wsdl_source)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the entry if it exists and is younger than `ttl_secs`.
    ///
    /// Returns `Ok(None)` on a miss or a stale entry.
    pub fn read_fresh(&self, ttl_secs: u64) -> io::Result<Option<Vec<u8>>> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let modified: DateTime<Utc> = metadata.modified()?.into();
        let age = Utc::now().signed_duration_since(modified).num_seconds();
        if age > 0 && age as u64 > ttl_secs {
            debug!(
                path = %self.path.display(),
                age_secs = age,
                ttl_secs,
                "WSDL cache entry expired"
            );
            return Ok(None);
        }

        std::fs::read(&self.path).map(Some)
    }

    /// Write `content` to the entry under an exclusive file lock.
    pub fn persist_blocking(&self, content: &[u8]) -> Result<()> {
        write_locked(&self.path, content).map_err(|source| ClientError::CachePersistFailed {
            path: self.path.clone(),
            source,
        })
    }

    /// Async wrapper around [`persist_blocking`](Self::persist_blocking).
    pub async fn persist(&self, content: Vec<u8>) -> Result<()> {
        let cache = self.clone();
        tokio::task::spawn_blocking(move || cache.persist_blocking(&content))
            .await
            .map_err(|e| ClientError::CachePersistFailed {
                path: self.path.clone(),
                source: io::Error::other(e),
            })?
    }
}

fn write_locked(path: &Path, content: &[u8]) -> io::Result<()> {
    // Truncate only after the lock is held.
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.lock()?;
    file.set_len(0)?;
    file.write_all(content)?;
    file.flush()?;
    file.unlock()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WSDL_URL: &str = "https://example.org/service?wsdl";

    #[test]
    fn test_cache_file_name_is_deterministic() {
        let a = cache_file_name("example.org", WSDL_URL);
        let b = cache_file_name("example.org", WSDL_URL);
        assert_eq!(a, b);
        assert!(a.starts_with("zentinel_soap_wsdl_cache_example.org-"));
        assert_eq!(a.len(), CACHE_PREFIX.len() + "example.org-".len() + 32);
    }

    #[test]
    fn test_cache_file_name_uses_md5_of_url() {
        let name = cache_file_name("example.org", "");
        assert!(name.ends_with("-d41d8cd98f00b204e9800998ecf8427e"));
    }

    #[test]
    fn test_distinct_urls_distinct_files() {
        let a = cache_file_name("example.org", "https://example.org/a?wsdl");
        let b = cache_file_name("example.org", "https://example.org/b?wsdl");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hints_disabled() {
        let hints = WsdlCacheHints::from_mode(&CacheMode::None, 0);
        assert_eq!(hints, WsdlCacheHints::default());
        assert!(!hints.enabled);
        assert_eq!(hints.ttl_secs, 0);
        assert_eq!(hints.limit, 0);
    }

    #[test]
    fn test_hints_enabled() {
        let mode = CacheMode::FileTtl {
            ttl_secs: SOAP_CACHE_TTL,
            max_entries: SOAP_CACHE_LIMIT,
        };
        let hints = WsdlCacheHints::from_mode(&mode, 60);
        assert!(hints.enabled);
        assert_eq!(hints.mode, 60);
        assert_eq!(hints.ttl_secs, 31_104_000);
        assert_eq!(hints.limit, 100);
    }

    #[test]
    fn test_read_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WsdlCache::new(dir.path(), "example.org", WSDL_URL);
        assert!(!cache.path().is_file());
        assert_eq!(cache.read_fresh(SOAP_CACHE_TTL).unwrap(), None);
    }

    #[test]
    fn test_persist_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WsdlCache::new(dir.path(), "example.org", WSDL_URL);

        cache.persist_blocking(b"<definitions/>").unwrap();
        assert!(cache.path().is_file());
        assert_eq!(
            cache.read_fresh(SOAP_CACHE_TTL).unwrap().as_deref(),
            Some(&b"<definitions/>"[..])
        );
    }

    #[test]
    fn test_persist_overwrites_longer_content() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WsdlCache::new(dir.path(), "example.org", WSDL_URL);

        cache.persist_blocking(b"<definitions>long content</definitions>").unwrap();
        cache.persist_blocking(b"<definitions/>").unwrap();
        assert_eq!(std::fs::read(cache.path()).unwrap(), b"<definitions/>");
    }

    #[test]
    fn test_persist_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does/not/exist");
        let cache = WsdlCache::new(&missing, "example.org", WSDL_URL);

        let result = cache.persist_blocking(b"<definitions/>");
        assert!(matches!(result, Err(ClientError::CachePersistFailed { .. })));
    }
}
