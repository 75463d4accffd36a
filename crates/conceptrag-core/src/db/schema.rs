//! Store schema and initialization
//!
//! One SQLite database per installation directory holds the four
//! conceptual tables (catalog, chunks, concepts, categories) plus the
//! auxiliary visuals table. Embeddings live inline as little-endian f32
//! BLOBs. The `id_aliases` table persists hash-collision resolutions so
//! IDs assigned at ingest are reproduced at query time.

use crate::error::Result;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

/// Main store handle
pub struct Database {
    pub(crate) conn: Connection,
}

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- One row per document
CREATE TABLE IF NOT EXISTS catalog (
    id INTEGER PRIMARY KEY,
    source TEXT NOT NULL UNIQUE,
    hash TEXT NOT NULL,
    title TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    doc_type TEXT NOT NULL DEFAULT 'unknown',
    category_ids TEXT NOT NULL DEFAULT '[]',
    vector BLOB,
    complete INTEGER NOT NULL DEFAULT 0
);

-- Text segments with concept tags
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY,
    catalog_id INTEGER NOT NULL,
    text TEXT NOT NULL,
    vector BLOB,
    concept_ids TEXT NOT NULL DEFAULT '[]',
    concept_density REAL,
    page_number INTEGER,
    token_count INTEGER NOT NULL DEFAULT 0,
    byte_offset INTEGER NOT NULL DEFAULT 0
);

-- Normalized terms discovered in documents
CREATE TABLE IF NOT EXISTS concepts (
    id INTEGER PRIMARY KEY,
    concept TEXT NOT NULL UNIQUE,
    summary TEXT NOT NULL DEFAULT '',
    catalog_ids TEXT NOT NULL DEFAULT '[]',
    related_concept_ids TEXT NOT NULL DEFAULT '[]',
    synonyms TEXT NOT NULL DEFAULT '[]',
    broader_terms TEXT NOT NULL DEFAULT '[]',
    narrower_terms TEXT NOT NULL DEFAULT '[]',
    vector BLOB,
    weight REAL NOT NULL DEFAULT 0
);

-- Category forest (parent links, depth bounded at walk time)
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    category TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    parent_category_id INTEGER,
    aliases TEXT NOT NULL DEFAULT '[]',
    related_categories TEXT NOT NULL DEFAULT '[]',
    document_count INTEGER NOT NULL DEFAULT 0,
    chunk_count INTEGER NOT NULL DEFAULT 0,
    concept_count INTEGER NOT NULL DEFAULT 0,
    vector BLOB
);

-- Extracted figures, diagrams, tables
CREATE TABLE IF NOT EXISTS visuals (
    id INTEGER PRIMARY KEY,
    catalog_id INTEGER NOT NULL,
    catalog_title TEXT NOT NULL DEFAULT '',
    image_path TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    vector BLOB,
    visual_type TEXT NOT NULL,
    page_number INTEGER,
    bounding_box TEXT,
    concept_ids TEXT NOT NULL DEFAULT '[]',
    concept_names TEXT NOT NULL DEFAULT '[]',
    chunk_ids TEXT NOT NULL DEFAULT '[]'
);

-- Concept membership index over chunks
CREATE TABLE IF NOT EXISTS chunk_concepts (
    chunk_id INTEGER NOT NULL,
    concept_id INTEGER NOT NULL,
    catalog_id INTEGER NOT NULL,
    PRIMARY KEY (chunk_id, concept_id)
);

-- Persisted hash-collision resolutions
CREATE TABLE IF NOT EXISTS id_aliases (
    canonical TEXT PRIMARY KEY,
    id INTEGER NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_chunks_catalog ON chunks(catalog_id);
CREATE INDEX IF NOT EXISTS idx_chunk_concepts_concept ON chunk_concepts(concept_id);
CREATE INDEX IF NOT EXISTS idx_chunk_concepts_catalog ON chunk_concepts(catalog_id);
CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_category_id);
CREATE INDEX IF NOT EXISTS idx_visuals_catalog ON visuals(catalog_id);
CREATE INDEX IF NOT EXISTS idx_catalog_hash ON catalog(hash);
"#;

impl Database {
    /// Open store at path, creating parent directories if necessary
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Initialize schema
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -64000;
             PRAGMA busy_timeout = 5000;",
        )?;

        self.conn.execute_batch(CREATE_TABLES)?;

        self.conn.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok();
        Ok(version)
    }

    /// Whether a table is present; missing concept/category tables are
    /// tolerated at container start and their services degrade to empty
    pub fn table_exists(&self, name: &str) -> bool {
        self.conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )
            .unwrap_or(false)
    }

    /// Persist a hash-collision resolution
    pub fn save_id_alias(&self, canonical: &str, id: u32) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO id_aliases (canonical, id) VALUES (?1, ?2)",
            params![canonical, id as i64],
        )?;
        Ok(())
    }

    /// Load all persisted collision resolutions
    pub fn load_id_aliases(&self) -> Result<HashMap<String, u32>> {
        let mut stmt = self.conn.prepare("SELECT canonical, id FROM id_aliases")?;
        let aliases = stmt
            .query_map([], |row| {
                let canonical: String = row.get(0)?;
                let id: i64 = row.get(1)?;
                Ok((canonical, id as u32))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        assert_eq!(db.schema_version().unwrap(), Some(SCHEMA_VERSION));
        assert!(db.table_exists("catalog"));
        assert!(db.table_exists("concepts"));
        assert!(!db.table_exists("nonexistent"));
    }

    #[test]
    fn test_id_alias_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.save_id_alias("API gateway::0", 42).unwrap();
        let aliases = db.load_id_aliases().unwrap();
        assert_eq!(aliases.get("API gateway::0"), Some(&42));
    }
}
