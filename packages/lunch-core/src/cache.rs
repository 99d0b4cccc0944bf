//! Day-partitioned file cache for resolver output.
//!
//! Cache entries live at `<root>/<YYYY-MM-DD>/<entity>[-<suffix>].<ext>`;
//! the path encodes the whole key, no metadata is stored in the file.
//! Entries are content-addressed only by that key: same-day entity
//! config edits do not invalidate them. That staleness is accepted and
//! resolves itself at day rollover.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{Local, NaiveDate};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Key of one cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Calendar day the entry is partitioned under.
    pub day: NaiveDate,

    /// Entity name (file-name prefix).
    pub entity: String,

    /// Resolver-kind suffix distinguishing artifacts of one entity.
    pub suffix: Option<String>,

    /// File extension.
    pub ext: String,
}

impl CacheKey {
    /// Build a key for the given entity artifact.
    pub fn new(
        day: NaiveDate,
        entity: impl Into<String>,
        suffix: Option<String>,
        ext: impl Into<String>,
    ) -> Self {
        Self {
            day,
            entity: entity.into(),
            suffix,
            ext: ext.into(),
        }
    }

    /// File name within the day directory.
    pub fn file_name(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}-{}.{}", self.entity, suffix, self.ext),
            None => format!("{}.{}", self.entity, self.ext),
        }
    }
}

/// File-based, calendar-day-partitioned memoization of resolve output.
pub struct DayCache {
    root: PathBuf,
    enabled: bool,
    // Per-key async locks de-duplicating concurrent same-key resolves.
    // Distinct keys never contend; the outer map lock is never held
    // across a fetch.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DayCache {
    /// Create a cache rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            root: root.into(),
            enabled,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Whether caching is enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Today's local calendar date, the default cache partition.
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Directory holding one day's artifacts.
    pub fn day_dir(&self, day: NaiveDate) -> PathBuf {
        self.root.join(day.format("%Y-%m-%d").to_string())
    }

    /// Full path of one cached artifact.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.day_dir(key.day).join(key.file_name())
    }

    /// Produce-or-fetch: return the cached content for `key` when
    /// present, otherwise run `fetch` and persist its non-empty output.
    ///
    /// Concurrent callers of the same key are serialized so the first
    /// one computes and the rest reuse the written file. A fetch that
    /// fails or returns empty content writes nothing.
    pub async fn wrap<F, Fut>(&self, key: &CacheKey, fetch: F) -> Option<Bytes>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Option<Bytes>>,
    {
        if !self.enabled {
            return fetch().await;
        }

        let path = self.entry_path(key);
        let key_lock = self.claim_lock(&path).await;
        let _guard = key_lock.lock().await;

        match tokio::fs::read(&path).await {
            Ok(content) => {
                debug!(path = %path.display(), "cache hit");
                return Some(Bytes::from(content));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cache read failed, re-fetching");
            }
        }

        let content = fetch().await?;
        if content.is_empty() {
            debug!(path = %path.display(), "empty resolve output, not cached");
            return Some(content);
        }

        if let Err(err) = self.persist(&path, &content).await {
            warn!(path = %path.display(), error = %err, "cache write failed");
        } else {
            debug!(path = %path.display(), bytes = content.len(), "cached");
        }
        Some(content)
    }

    async fn claim_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let key = path.to_string_lossy().into_owned();
        let mut locks = self.locks.lock().await;
        locks.entry(key).or_default().clone()
    }

    async fn persist(&self, path: &Path, content: &Bytes) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await
    }

    /// Delete cached artifacts for a day.
    ///
    /// With no entities the whole day directory is removed; with
    /// entities only files whose name-prefix matches one of them.
    /// Returns the removed paths.
    pub async fn clear(&self, entities: &[String], day: NaiveDate) -> Result<Vec<PathBuf>> {
        let dir = self.day_dir(day);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        if entities.is_empty() {
            tokio::fs::remove_dir_all(&dir).await?;
            info!(dir = %dir.display(), "cleared day cache");
            return Ok(vec![dir]);
        }

        let mut removed = Vec::new();
        for entity in entities {
            for path in self.paths_for_entity(entity, day).await? {
                tokio::fs::remove_file(&path).await?;
                info!(path = %path.display(), "cleared cache entry");
                removed.push(path);
            }
        }
        Ok(removed)
    }

    /// File names of all artifacts cached for a day, sorted.
    pub async fn list_day(&self, day: NaiveDate) -> Result<Vec<String>> {
        let dir = self.day_dir(day);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Paths of all artifacts cached for one entity on a day.
    pub async fn paths_for_entity(&self, entity: &str, day: NaiveDate) -> Result<Vec<PathBuf>> {
        let dir = self.day_dir(day);
        let mut paths = Vec::new();
        for name in self.list_day(day).await? {
            if file_belongs_to(&name, entity) {
                paths.push(dir.join(name));
            }
        }
        Ok(paths)
    }
}

/// Whether a cache file name belongs to the entity, i.e. starts with the
/// entity name followed by a suffix separator or the extension dot.
fn file_belongs_to(file_name: &str, entity: &str) -> bool {
    match file_name.strip_prefix(entity) {
        Some(rest) => rest.starts_with('-') || rest.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn key(d: u32, entity: &str) -> CacheKey {
        CacheKey::new(day(d), entity, None, "txt")
    }

    #[test]
    fn test_key_file_name() {
        let plain = CacheKey::new(day(3), "nepal", None, "txt");
        assert_eq!(plain.file_name(), "nepal.txt");

        let suffixed = CacheKey::new(day(3), "nepal", Some("html".to_string()), "html");
        assert_eq!(suffixed.file_name(), "nepal-html.html");
    }

    #[tokio::test]
    async fn test_wrap_memoizes_first_result() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DayCache::new(dir.path(), true);
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(Bytes::from("menu v1"))
        };
        let first = cache.wrap(&key(3, "nepal"), fetch).await.unwrap();

        let refetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(Bytes::from("menu v2"))
        };
        let second = cache.wrap(&key(3, "nepal"), refetch).await.unwrap();

        assert_eq!(first, Bytes::from("menu v1"));
        assert_eq!(second, Bytes::from("menu v1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_day_rollover_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DayCache::new(dir.path(), true);
        let calls = AtomicUsize::new(0);

        for d in [3, 4] {
            cache
                .wrap(&key(d, "nepal"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Some(Bytes::from("menu"))
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_cache_calls_through() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DayCache::new(dir.path(), false);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .wrap(&key(3, "nepal"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Some(Bytes::from("menu"))
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.list_day(day(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_and_failed_fetch_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DayCache::new(dir.path(), true);

        let empty = cache
            .wrap(&key(3, "nepal"), || async { Some(Bytes::new()) })
            .await;
        assert_eq!(empty, Some(Bytes::new()));

        let failed = cache.wrap(&key(3, "globus"), || async { None }).await;
        assert!(failed.is_none());

        assert!(cache.list_day(day(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_same_key_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(DayCache::new(dir.path(), true));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .wrap(&key(3, "nepal"), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Some(Bytes::from("menu"))
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(Bytes::from("menu")));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_whole_day_and_per_entity() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DayCache::new(dir.path(), true);

        for (entity, suffix) in [("nepal", None), ("nepal", Some("html")), ("globus", None)] {
            let key = CacheKey::new(day(3), entity, suffix.map(str::to_string), "txt");
            cache
                .wrap(&key, || async { Some(Bytes::from("menu")) })
                .await;
        }
        assert_eq!(cache.list_day(day(3)).await.unwrap().len(), 3);

        let removed = cache.clear(&["nepal".to_string()], day(3)).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(cache.list_day(day(3)).await.unwrap(), vec!["globus.txt"]);

        let removed = cache.clear(&[], day(3)).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert!(cache.list_day(day(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prefix_matching_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DayCache::new(dir.path(), true);

        for entity in ["nepal", "nepal-express"] {
            let key = CacheKey::new(day(3), entity, None, "txt");
            cache
                .wrap(&key, || async { Some(Bytes::from("menu")) })
                .await;
        }

        // "nepal-express.txt" also starts with "nepal-", so the suffix
        // separator makes it match the shorter entity too; exact-stem
        // files never match a longer entity name.
        let paths = cache.paths_for_entity("nepal-express", day(3)).await.unwrap();
        assert_eq!(paths.len(), 1);
    }
}
