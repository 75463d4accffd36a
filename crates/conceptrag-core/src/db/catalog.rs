//! Catalog table operations

use super::rows::{parse_id_array, CatalogEntry, DocType};
use super::vectors::{bytes_to_embedding, embedding_to_bytes};
use super::{encode_id_array, Database, Predicate};
use crate::error::Result;
use rusqlite::{params, Row};

fn map_catalog_row(row: &Row) -> rusqlite::Result<CatalogEntry> {
    let id: i64 = row.get(0)?;
    let category_ids: String = row.get(6)?;
    let vector: Option<Vec<u8>> = row.get(7)?;
    Ok(CatalogEntry {
        id: id as u32,
        source: row.get(1)?,
        hash: row.get(2)?,
        title: row.get(3)?,
        summary: row.get(4)?,
        doc_type: DocType::parse(&row.get::<_, String>(5)?),
        category_ids: parse_id_array(&category_ids),
        vector: vector.map(|b| bytes_to_embedding(&b)).unwrap_or_default(),
        complete: row.get::<_, i64>(8)? != 0,
    })
}

const CATALOG_COLUMNS: &str =
    "id, source, hash, title, summary, doc_type, category_ids, vector, complete";

impl Database {
    /// Insert or replace a catalog entry
    pub fn upsert_catalog_entry(&self, entry: &CatalogEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO catalog
             (id, source, hash, title, summary, doc_type, category_ids, vector, complete)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.id as i64,
                entry.source,
                entry.hash,
                entry.title,
                entry.summary,
                entry.doc_type.as_str(),
                encode_id_array(&entry.category_ids),
                if entry.vector.is_empty() {
                    None
                } else {
                    Some(embedding_to_bytes(&entry.vector))
                },
                entry.complete as i64,
            ],
        )?;
        Ok(())
    }

    /// Get a catalog entry by id
    pub fn get_catalog_entry(&self, id: u32) -> Result<Option<CatalogEntry>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM catalog WHERE id = ?1", CATALOG_COLUMNS),
            params![id as i64],
            map_catalog_row,
        );
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a catalog entry by its stable source path
    pub fn get_catalog_by_source(&self, source: &str) -> Result<Option<CatalogEntry>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM catalog WHERE source = ?1", CATALOG_COLUMNS),
            params![source],
            map_catalog_row,
        );
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a catalog entry by content hash
    pub fn get_catalog_by_hash(&self, hash: &str) -> Result<Option<CatalogEntry>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {} FROM catalog WHERE hash = ?1 LIMIT 1",
                CATALOG_COLUMNS
            ),
            params![hash],
            map_catalog_row,
        );
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Scan catalog rows, ordered by id for determinism
    pub fn scan_catalog(&self, limit: usize) -> Result<Vec<CatalogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM catalog ORDER BY id LIMIT ?1",
            CATALOG_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![limit as i64], map_catalog_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Filtered catalog scan via the typed predicate builder
    pub fn where_catalog(&self, predicate: &Predicate, limit: usize) -> Result<Vec<CatalogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM catalog WHERE {} ORDER BY id LIMIT ?1",
            CATALOG_COLUMNS,
            predicate.to_sql()
        ))?;
        let entries = stmt
            .query_map(params![limit as i64], map_catalog_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Documents whose category_ids contain the given category
    pub fn find_catalog_by_category(&self, category_id: u32) -> Result<Vec<CatalogEntry>> {
        let all = self.scan_catalog(usize::MAX >> 1)?;
        Ok(all
            .into_iter()
            .filter(|entry| entry.category_ids.contains(&category_id))
            .collect())
    }

    /// All catalog (id, vector) pairs with a stored embedding
    pub fn catalog_vectors(&self) -> Result<Vec<(u32, Vec<f32>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, vector FROM catalog WHERE vector IS NOT NULL")?;
        let vectors = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                Ok((id as u32, bytes_to_embedding(&bytes)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vectors)
    }

    /// Mark a document's seeding as complete or pending
    pub fn set_catalog_complete(&self, id: u32, complete: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE catalog SET complete = ?2 WHERE id = ?1",
            params![id as i64, complete as i64],
        )?;
        Ok(())
    }

    /// Update summary in place (summaries stage)
    pub fn set_catalog_summary(&self, id: u32, summary: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE catalog SET summary = ?2 WHERE id = ?1",
            params![id as i64, summary],
        )?;
        Ok(())
    }

    /// Update derived category ids (categories stage)
    pub fn set_catalog_categories(&self, id: u32, category_ids: &[u32]) -> Result<()> {
        self.conn.execute(
            "UPDATE catalog SET category_ids = ?2 WHERE id = ?1",
            params![id as i64, encode_id_array(category_ids)],
        )?;
        Ok(())
    }

    /// Delete a document and everything hanging off it
    pub fn delete_document(&self, catalog_id: u32) -> Result<()> {
        let id = catalog_id as i64;
        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            self.conn
                .execute("DELETE FROM chunk_concepts WHERE catalog_id = ?1", params![id])?;
            self.conn
                .execute("DELETE FROM chunks WHERE catalog_id = ?1", params![id])?;
            self.conn
                .execute("DELETE FROM visuals WHERE catalog_id = ?1", params![id])?;
            self.conn
                .execute("DELETE FROM catalog WHERE id = ?1", params![id])?;
            Ok(())
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Number of catalog rows
    pub fn count_catalog(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM catalog", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
