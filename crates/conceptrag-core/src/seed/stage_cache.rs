//! Per-document stage cache
//!
//! JSON files under `<db>/.stage-cache/<collection_hash>/<file_hash>.json`
//! holding concepts and overview extracted in a prior run, so a failed
//! seed does not repeat expensive extraction. Entries expire after the
//! TTL and are then treated as absent.

use crate::error::Result;
use crate::ids::hash_to_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default entry lifetime: 7 days
pub const STAGE_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cached per-document extraction results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCacheEntry {
    pub hash: String,
    pub source: String,
    pub processed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concepts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl StageCacheEntry {
    pub fn new(hash: &str, source: &str) -> Self {
        Self {
            hash: hash.to_string(),
            source: source.to_string(),
            processed_at: Utc::now().to_rfc3339(),
            concepts: None,
            content_overview: None,
            metadata: None,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        match DateTime::parse_from_rfc3339(&self.processed_at) {
            Ok(processed) => {
                let age = Utc::now().signed_duration_since(processed.with_timezone(&Utc));
                age.num_seconds() >= ttl.as_secs() as i64
            }
            // Unparseable timestamp counts as expired
            Err(_) => true,
        }
    }
}

/// Stage cache rooted at `<db>/.stage-cache`, scoped per files-dir
pub struct StageCache {
    dir: PathBuf,
    ttl: Duration,
}

impl StageCache {
    pub fn new(cache_root: &Path, files_dir: &Path) -> Self {
        let collection_hash = format!("{:08x}", hash_to_id(&files_dir.display().to_string()));
        Self {
            dir: cache_root.join(collection_hash),
            ttl: STAGE_CACHE_TTL,
        }
    }

    #[cfg(test)]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn entry_path(&self, file_hash: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_hash))
    }

    /// Load a live entry; expired or unreadable entries read as absent
    pub fn get(&self, file_hash: &str) -> Option<StageCacheEntry> {
        let path = self.entry_path(file_hash);
        let content = std::fs::read_to_string(path).ok()?;
        let entry: StageCacheEntry = serde_json::from_str(&content).ok()?;
        if entry.is_expired(self.ttl) {
            tracing::debug!(hash = file_hash, "stage cache entry expired");
            return None;
        }
        Some(entry)
    }

    /// Persist an entry (atomic, like the checkpoint)
    pub fn put(&self, entry: &StageCacheEntry) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(&entry.hash);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entry)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Remove one entry, if present
    pub fn remove(&self, file_hash: &str) {
        let _ = std::fs::remove_file(self.entry_path(file_hash));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = StageCache::new(dir.path(), Path::new("/library/books"));

        let mut entry = StageCacheEntry::new("abc123", "books/a.txt");
        entry.concepts = Some(vec!["api gateway".to_string()]);
        entry.content_overview = Some("A book about gateways.".to_string());
        cache.put(&entry).unwrap();

        let loaded = cache.get("abc123").unwrap();
        assert_eq!(loaded.source, "books/a.txt");
        assert_eq!(loaded.concepts.unwrap(), vec!["api gateway".to_string()]);
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_expired_entry_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let cache =
            StageCache::new(dir.path(), Path::new("/library/books")).with_ttl(Duration::ZERO);

        let entry = StageCacheEntry::new("abc123", "books/a.txt");
        cache.put(&entry).unwrap();
        assert!(cache.get("abc123").is_none());
    }

    #[test]
    fn test_collections_are_isolated() {
        let dir = TempDir::new().unwrap();
        let cache_a = StageCache::new(dir.path(), Path::new("/library/a"));
        let cache_b = StageCache::new(dir.path(), Path::new("/library/b"));

        cache_a
            .put(&StageCacheEntry::new("abc123", "a.txt"))
            .unwrap();
        assert!(cache_a.get("abc123").is_some());
        assert!(cache_b.get("abc123").is_none());
    }
}
