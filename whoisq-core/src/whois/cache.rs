//! Response cache for lookup executors.
//!
//! Entries are keyed by the query text and the server it was sent to, and
//! expire after a TTL. A cache file, when given, is read the first time it is
//! seen and rewritten with its own entries after every insert.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::engine::{LookupExecutor, LookupRequest};
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    response: String,
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(response: String) -> Self {
        Self {
            response,
            fetched_at: Utc::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        match (Utc::now() - self.fetched_at).to_std() {
            Ok(age) => age >= ttl,
            // Timestamp in the future, clock moved
            Err(_) => false,
        }
    }
}

type Store = HashMap<String, CacheEntry>;

/// Thread-safe store of raw WHOIS responses.
///
/// Each cache file owns its own set of entries, so saving one file never
/// leaks responses fetched for another. Lookups without a file share the
/// in-memory store under `None`.
pub struct LookupCache {
    stores: RwLock<HashMap<Option<PathBuf>, Store>>,
    loaded_files: Mutex<HashSet<PathBuf>>,
    ttl: Duration,
}

impl LookupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
            loaded_files: Mutex::new(HashSet::new()),
            ttl,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Option<PathBuf>, Store>> {
        match self.stores.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Cache read lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Option<PathBuf>, Store>> {
        match self.stores.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Cache write lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn loaded(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        match self.loaded_files.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The cached response, unless missing or older than the TTL.
    pub fn get(&self, file: Option<&Path>, key: &str) -> Option<String> {
        let stores = self.read();
        let entry = stores.get(&file.map(Path::to_path_buf))?.get(key)?;
        if entry.is_expired(self.ttl) {
            debug!(key, "Cache entry expired");
            None
        } else {
            Some(entry.response.clone())
        }
    }

    pub fn insert(&self, file: Option<&Path>, key: String, response: String) {
        debug!(key = %key, "Inserting cache entry");
        self.write()
            .entry(file.map(Path::to_path_buf))
            .or_default()
            .insert(key, CacheEntry::new(response));
    }

    /// Number of entries across all files.
    pub fn len(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge a cache file into that file's store, once per path. Entries
    /// already in memory win. A missing file is treated as empty and an
    /// unparsable one is ignored with a warning. Other read errors are
    /// returned and the file is tried again on the next lookup.
    pub async fn load_file(&self, path: &Path) -> Result<()> {
        if self.loaded().contains(path) {
            return Ok(());
        }

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.loaded().insert(path.to_path_buf());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        self.loaded().insert(path.to_path_buf());

        let stored: Store = match serde_json::from_str(&contents) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable cache file");
                return Ok(());
            }
        };

        let mut stores = self.write();
        let entries = stores.entry(Some(path.to_path_buf())).or_default();
        let before = entries.len();
        for (key, entry) in stored {
            entries.entry(key).or_insert(entry);
        }
        debug!(path = %path.display(), added = entries.len() - before, "Loaded cache file");
        Ok(())
    }

    /// Write the entries belonging to `path` as JSON.
    pub async fn save_file(&self, path: &Path) -> Result<()> {
        let json = {
            let stores = self.read();
            match stores.get(&Some(path.to_path_buf())) {
                Some(entries) => serde_json::to_string(entries)?,
                None => serde_json::to_string(&Store::new())?,
            }
        };
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

fn cache_key(request: &LookupRequest) -> String {
    match &request.server {
        Some(server) => format!("{}@{}", request.query_string(), server),
        None => request.query_string(),
    }
}

/// Caches the responses of another executor.
///
/// `force` skips the cache read but still stores the fresh answer. After a
/// lookup that went to the network, the request's delay is slept off.
pub struct CachingExecutor<E> {
    inner: E,
    cache: LookupCache,
}

impl<E> CachingExecutor<E> {
    pub fn new(inner: E, ttl: Duration) -> Self {
        Self {
            inner,
            cache: LookupCache::new(ttl),
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }
}

impl<E: LookupExecutor> LookupExecutor for CachingExecutor<E> {
    #[instrument(skip(self, request), fields(query = %request.query_string()))]
    async fn lookup(&self, request: &LookupRequest) -> Result<String> {
        let key = cache_key(request);
        let file = request.cache.file.as_deref();

        if let Some(path) = file {
            self.cache.load_file(path).await?;
        }

        if !request.cache.force {
            if let Some(hit) = self.cache.get(file, &key) {
                debug!(key = %key, "Cache hit");
                return Ok(hit);
            }
        }

        let response = self.inner.lookup(request).await?;
        self.cache.insert(file, key, response.clone());

        if let Some(path) = file {
            self.cache.save_file(path).await?;
        }

        if !request.delay.is_zero() {
            debug!(delay_ms = request.delay.as_millis() as u64, "Slowing down");
            tokio::time::sleep(request.delay).await;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::engine::testing::RecordingExecutor;
    use crate::engine::CachePolicy;
    use crate::labels::LabelSequence;

    const TTL: Duration = Duration::from_secs(3600);

    fn request(domain: &str) -> LookupRequest {
        LookupRequest {
            labels: LabelSequence::new(domain.split('.')),
            name_hint: false,
            server: None,
            delay: Duration::ZERO,
            cache: CachePolicy::default(),
            ignore_returncode: false,
        }
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let executor = CachingExecutor::new(
            RecordingExecutor::new().respond("example.com", "Domain Name: example.com"),
            TTL,
        );

        let first = executor.lookup(&request("example.com")).await.unwrap();
        let second = executor.lookup(&request("example.com")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(executor.inner().calls(), 1);
        assert_eq!(executor.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_force_bypasses_cache() {
        let executor = CachingExecutor::new(RecordingExecutor::new(), TTL);
        let mut req = request("example.com");
        executor.lookup(&req).await.unwrap();

        req.cache.force = true;
        executor.lookup(&req).await.unwrap();

        assert_eq!(executor.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_server_is_part_of_key() {
        let executor = CachingExecutor::new(RecordingExecutor::new(), TTL);
        let mut req = request("example.com");
        executor.lookup(&req).await.unwrap();

        req.server = Some("whois.example.net".to_string());
        executor.lookup(&req).await.unwrap();
        executor.lookup(&req).await.unwrap();

        assert_eq!(executor.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched() {
        let executor = CachingExecutor::new(RecordingExecutor::new(), Duration::ZERO);
        executor.lookup(&request("example.com")).await.unwrap();
        executor.lookup(&request("example.com")).await.unwrap();

        assert_eq!(executor.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_errors_not_cached() {
        let executor = CachingExecutor::new(RecordingExecutor::failing(), TTL);
        assert!(executor.lookup(&request("example.com")).await.is_err());
        assert!(executor.cache().is_empty());
    }

    #[tokio::test]
    async fn test_delay_applied_after_network_lookup() {
        let executor = CachingExecutor::new(RecordingExecutor::new(), TTL);
        let mut req = request("example.com");
        req.delay = Duration::from_millis(50);

        let start = Instant::now();
        executor.lookup(&req).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));

        // Cache hits do not wait
        let start = Instant::now();
        executor.lookup(&req).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_cache_file_persists_across_executors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whois-cache.json");

        let mut req = request("example.com");
        req.cache.file = Some(path.clone());

        let writer = CachingExecutor::new(
            RecordingExecutor::new().respond("example.com", "Domain Name: example.com"),
            TTL,
        );
        writer.lookup(&req).await.unwrap();
        assert!(path.exists());

        let reader = CachingExecutor::new(RecordingExecutor::new(), TTL);
        let response = reader.lookup(&req).await.unwrap();

        assert_eq!(response, "Domain Name: example.com");
        assert_eq!(reader.inner().calls(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_cache_file_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whois-cache.json");
        std::fs::write(&path, "not json").unwrap();

        let executor = CachingExecutor::new(RecordingExecutor::new(), TTL);
        let mut req = request("example.com");
        req.cache.file = Some(path.clone());

        executor.lookup(&req).await.unwrap();
        assert_eq!(executor.inner().calls(), 1);

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("example.com"));
    }

    #[tokio::test]
    async fn test_failed_read_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whois-cache.json");
        // A directory in place of the file makes the read fail
        std::fs::create_dir(&path).unwrap();

        let cache = LookupCache::new(TTL);
        assert!(cache.load_file(&path).await.is_err());
        assert!(cache.load_file(&path).await.is_err());

        std::fs::remove_dir(&path).unwrap();
        let seeded = LookupCache::new(TTL);
        seeded.insert(Some(path.as_path()), "example.com".to_string(), "Domain Name: example.com".to_string());
        seeded.save_file(&path).await.unwrap();

        cache.load_file(&path).await.unwrap();
        assert_eq!(
            cache.get(Some(path.as_path()), "example.com").as_deref(),
            Some("Domain Name: example.com")
        );
    }

    #[tokio::test]
    async fn test_cache_files_keep_their_own_entries() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");

        let executor = CachingExecutor::new(
            RecordingExecutor::new()
                .respond("a.com", "Domain Name: a.com")
                .respond("b.com", "Domain Name: b.com"),
            TTL,
        );

        let mut req = request("a.com");
        req.cache.file = Some(first.clone());
        executor.lookup(&req).await.unwrap();

        let mut req = request("b.com");
        req.cache.file = Some(second.clone());
        executor.lookup(&req).await.unwrap();

        let first_saved = std::fs::read_to_string(&first).unwrap();
        let second_saved = std::fs::read_to_string(&second).unwrap();
        assert!(first_saved.contains("a.com"));
        assert!(!first_saved.contains("b.com"));
        assert!(second_saved.contains("b.com"));
        assert!(!second_saved.contains("a.com"));

        // An entry cached for one file is not served for another
        let mut req = request("a.com");
        req.cache.file = Some(second.clone());
        executor.lookup(&req).await.unwrap();
        assert_eq!(executor.inner().calls(), 3);
    }
}
