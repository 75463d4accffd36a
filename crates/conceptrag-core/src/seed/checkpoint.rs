//! Seeding checkpoint
//!
//! JSON file at `<db>/.seeding-checkpoint.json` recording which content
//! hashes were processed and which stage the run reached. Writes go to a
//! `.tmp` sibling and are renamed into place, so a killed process leaves
//! either the old file or the new one, never a torn write.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Checkpoint format version
pub const CHECKPOINT_VERSION: u32 = 1;

/// Seeding stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedStage {
    Documents,
    Concepts,
    Summaries,
    Categories,
    Complete,
}

/// On-disk checkpoint state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub processed_hashes: Vec<String>,
    pub stage: SeedStage,
    pub last_file: String,
    pub last_updated_at: String,
    pub total_processed: u64,
    pub total_failed: u64,
    pub failed_files: Vec<String>,
    pub version: u32,
    pub database_path: String,
    pub files_dir: String,
}

impl Checkpoint {
    pub fn new(database_path: &Path, files_dir: &Path) -> Self {
        Self {
            processed_hashes: Vec::new(),
            stage: SeedStage::Documents,
            last_file: String::new(),
            last_updated_at: chrono::Utc::now().to_rfc3339(),
            total_processed: 0,
            total_failed: 0,
            failed_files: Vec::new(),
            version: CHECKPOINT_VERSION,
            database_path: database_path.display().to_string(),
            files_dir: files_dir.display().to_string(),
        }
    }

    /// Load an existing checkpoint, validating it against the current
    /// paths. Mismatches warn but do not block the resume.
    pub fn load(path: &Path, database_path: &Path, files_dir: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&content)?;

        if checkpoint.version != CHECKPOINT_VERSION {
            tracing::warn!(
                found = checkpoint.version,
                expected = CHECKPOINT_VERSION,
                "checkpoint version mismatch"
            );
        }
        if checkpoint.database_path != database_path.display().to_string() {
            tracing::warn!(
                stored = %checkpoint.database_path,
                current = %database_path.display(),
                "checkpoint database path differs"
            );
        }
        if checkpoint.files_dir != files_dir.display().to_string() {
            tracing::warn!(
                stored = %checkpoint.files_dir,
                current = %files_dir.display(),
                "checkpoint files dir differs"
            );
        }

        Ok(Some(checkpoint))
    }

    /// Atomic save: write `.tmp`, then rename over the target
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp: PathBuf = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn touch(&mut self) {
        self.last_updated_at = chrono::Utc::now().to_rfc3339();
    }

    pub fn processed(&self) -> HashSet<&str> {
        self.processed_hashes.iter().map(String::as_str).collect()
    }

    pub fn record_processed(&mut self, hash: &str, file: &str) {
        if !self.processed_hashes.iter().any(|h| h == hash) {
            self.processed_hashes.push(hash.to_string());
            self.total_processed += 1;
        }
        self.last_file = file.to_string();
        self.touch();
    }

    pub fn record_failed(&mut self, file: &str) {
        if !self.failed_files.iter().any(|f| f == file) {
            self.failed_files.push(file.to_string());
            self.total_failed += 1;
        }
        self.last_file = file.to_string();
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".seeding-checkpoint.json");
        let db = dir.path().join("db");
        let files = dir.path().join("files");

        let mut checkpoint = Checkpoint::new(&db, &files);
        checkpoint.record_processed("abc", "books/a.txt");
        checkpoint.record_processed("def", "books/b.txt");
        checkpoint.record_failed("books/broken.txt");
        checkpoint.stage = SeedStage::Concepts;
        checkpoint.save(&path).unwrap();

        let loaded = Checkpoint::load(&path, &db, &files).unwrap().unwrap();
        assert_eq!(loaded.total_processed, 2);
        assert_eq!(loaded.total_failed, 1);
        assert_eq!(loaded.stage, SeedStage::Concepts);
        assert!(loaded.processed().contains("abc"));
        assert_eq!(loaded.last_file, "books/broken.txt");
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = Checkpoint::load(
            &dir.path().join("nope.json"),
            dir.path(),
            dir.path(),
        )
        .unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_processed_is_deduplicated() {
        let dir = TempDir::new().unwrap();
        let mut checkpoint = Checkpoint::new(dir.path(), dir.path());
        checkpoint.record_processed("abc", "a");
        checkpoint.record_processed("abc", "a");
        assert_eq!(checkpoint.total_processed, 1);
        assert_eq!(checkpoint.processed_hashes.len(), 1);
    }

    #[test]
    fn test_save_leaves_no_tmp_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".seeding-checkpoint.json");
        let checkpoint = Checkpoint::new(dir.path(), dir.path());
        checkpoint.save(&path).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
