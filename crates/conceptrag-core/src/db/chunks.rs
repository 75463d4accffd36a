//! Chunk table operations

use super::rows::{parse_id_array, Chunk};
use super::vectors::{bytes_to_embedding, embedding_to_bytes};
use super::{encode_id_array, Database, Predicate};
use crate::error::Result;
use rusqlite::{params, Row};
use std::collections::HashSet;

const CHUNK_COLUMNS: &str =
    "id, catalog_id, text, vector, concept_ids, concept_density, page_number, token_count, byte_offset";

fn map_chunk_row(row: &Row) -> rusqlite::Result<Chunk> {
    let id: i64 = row.get(0)?;
    let catalog_id: i64 = row.get(1)?;
    let vector: Option<Vec<u8>> = row.get(3)?;
    let concept_ids: String = row.get(4)?;
    let page_number: Option<i64> = row.get(6)?;
    let token_count: i64 = row.get(7)?;
    let byte_offset: i64 = row.get(8)?;
    Ok(Chunk {
        id: id as u32,
        catalog_id: catalog_id as u32,
        text: row.get(2)?,
        vector: vector.map(|b| bytes_to_embedding(&b)).unwrap_or_default(),
        concept_ids: parse_id_array(&concept_ids),
        concept_density: row.get(5)?,
        page_number: page_number.map(|p| p as u32),
        token_count: token_count as usize,
        byte_offset: byte_offset as usize,
    })
}

impl Database {
    /// Insert or replace a chunk
    pub fn upsert_chunk(&self, chunk: &Chunk) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO chunks
             (id, catalog_id, text, vector, concept_ids, concept_density, page_number, token_count, byte_offset)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                chunk.id as i64,
                chunk.catalog_id as i64,
                chunk.text,
                if chunk.vector.is_empty() {
                    None
                } else {
                    Some(embedding_to_bytes(&chunk.vector))
                },
                encode_id_array(&chunk.concept_ids),
                chunk.concept_density,
                chunk.page_number.map(|p| p as i64),
                chunk.token_count as i64,
                chunk.byte_offset as i64,
            ],
        )?;
        Ok(())
    }

    /// Get a chunk by id
    pub fn get_chunk(&self, id: u32) -> Result<Option<Chunk>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM chunks WHERE id = ?1", CHUNK_COLUMNS),
            params![id as i64],
            map_chunk_row,
        );
        match result {
            Ok(chunk) => Ok(Some(chunk)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Scan chunks, ordered by id for determinism
    pub fn scan_chunks(&self, limit: usize) -> Result<Vec<Chunk>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM chunks ORDER BY id LIMIT ?1",
            CHUNK_COLUMNS
        ))?;
        let chunks = stmt
            .query_map(params![limit as i64], map_chunk_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    /// Filtered chunk scan via the typed predicate builder
    pub fn where_chunks(&self, predicate: &Predicate, limit: usize) -> Result<Vec<Chunk>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM chunks WHERE {} ORDER BY id LIMIT ?1",
            CHUNK_COLUMNS,
            predicate.to_sql()
        ))?;
        let chunks = stmt
            .query_map(params![limit as i64], map_chunk_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    /// All chunks of one document
    pub fn chunks_for_catalog(&self, catalog_id: u32) -> Result<Vec<Chunk>> {
        self.where_chunks(&Predicate::eq_id("catalog_id", catalog_id), usize::MAX >> 1)
    }

    /// Record a chunk's concept membership: the array column plus the
    /// membership index rows used for O(log n) lookups
    pub fn set_chunk_concepts(
        &self,
        chunk_id: u32,
        catalog_id: u32,
        concept_ids: &[u32],
        concept_density: f64,
    ) -> Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            self.conn.execute(
                "UPDATE chunks SET concept_ids = ?2, concept_density = ?3 WHERE id = ?1",
                params![
                    chunk_id as i64,
                    encode_id_array(concept_ids),
                    concept_density
                ],
            )?;
            self.conn.execute(
                "DELETE FROM chunk_concepts WHERE chunk_id = ?1",
                params![chunk_id as i64],
            )?;
            for concept_id in concept_ids {
                self.conn.execute(
                    "INSERT OR IGNORE INTO chunk_concepts (chunk_id, concept_id, catalog_id)
                     VALUES (?1, ?2, ?3)",
                    params![chunk_id as i64, *concept_id as i64, catalog_id as i64],
                )?;
            }
            Ok(())
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Chunk ids tagged with a concept
    pub fn chunk_ids_for_concept(&self, concept_id: u32) -> Result<HashSet<u32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT chunk_id FROM chunk_concepts WHERE concept_id = ?1")?;
        let ids = stmt
            .query_map(params![concept_id as i64], |row| {
                let id: i64 = row.get(0)?;
                Ok(id as u32)
            })?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// Chunks tagged with a concept inside one document, densest first
    pub fn chunks_for_concept_in_catalog(
        &self,
        concept_id: u32,
        catalog_id: u32,
        limit: usize,
    ) -> Result<Vec<Chunk>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.catalog_id, c.text, c.vector, c.concept_ids, c.concept_density,
                    c.page_number, c.token_count, c.byte_offset
             FROM chunks c
             JOIN chunk_concepts cc ON cc.chunk_id = c.id
             WHERE cc.concept_id = ?1 AND cc.catalog_id = ?2
             ORDER BY c.concept_density DESC, c.id
             LIMIT ?3",
        )?;
        let chunks = stmt
            .query_map(
                params![concept_id as i64, catalog_id as i64, limit as i64],
                map_chunk_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    /// Total chunks tagged with a concept across a set of documents
    pub fn count_chunks_for_concept(&self, concept_id: u32) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chunk_concepts WHERE concept_id = ?1",
            params![concept_id as i64],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All chunk (id, vector) pairs with a stored embedding
    pub fn chunk_vectors(&self) -> Result<Vec<(u32, Vec<f32>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, vector FROM chunks WHERE vector IS NOT NULL")?;
        let vectors = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                Ok((id as u32, bytes_to_embedding(&bytes)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vectors)
    }

    /// Drop one document's chunks and their concept links
    pub fn delete_chunks_for_catalog(&self, catalog_id: u32) -> Result<usize> {
        self.conn.execute(
            "DELETE FROM chunk_concepts WHERE catalog_id = ?1",
            params![catalog_id as i64],
        )?;
        let rows = self.conn.execute(
            "DELETE FROM chunks WHERE catalog_id = ?1",
            params![catalog_id as i64],
        )?;
        Ok(rows)
    }

    /// Number of chunk rows
    pub fn count_chunks(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: u32, catalog_id: u32, text: &str) -> Chunk {
        Chunk {
            id,
            catalog_id,
            text: text.to_string(),
            vector: vec![1.0, 0.0],
            concept_ids: vec![],
            concept_density: None,
            page_number: Some(3),
            token_count: text.split_whitespace().count(),
            byte_offset: 0,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.upsert_chunk(&chunk(1, 7, "the api gateway routes requests"))
            .unwrap();
        let loaded = db.get_chunk(1).unwrap().unwrap();
        assert_eq!(loaded.catalog_id, 7);
        assert_eq!(loaded.page_number, Some(3));
        assert_eq!(loaded.token_count, 5);
    }

    #[test]
    fn test_concept_membership() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.upsert_chunk(&chunk(1, 7, "gateway text")).unwrap();
        db.upsert_chunk(&chunk(2, 7, "other text")).unwrap();
        db.set_chunk_concepts(1, 7, &[100, 200], 0.4).unwrap();
        db.set_chunk_concepts(2, 7, &[200], 0.2).unwrap();

        let ids = db.chunk_ids_for_concept(200).unwrap();
        assert!(ids.contains(&1) && ids.contains(&2));
        assert_eq!(db.chunk_ids_for_concept(100).unwrap().len(), 1);
        assert_eq!(db.count_chunks_for_concept(200).unwrap(), 2);

        let loaded = db.get_chunk(1).unwrap().unwrap();
        assert_eq!(loaded.concept_ids, vec![100, 200]);
        assert_eq!(loaded.concept_density, Some(0.4));
    }

    #[test]
    fn test_densest_first_within_catalog() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.upsert_chunk(&chunk(1, 7, "a")).unwrap();
        db.upsert_chunk(&chunk(2, 7, "b")).unwrap();
        db.upsert_chunk(&chunk(3, 8, "c")).unwrap();
        db.set_chunk_concepts(1, 7, &[100], 0.2).unwrap();
        db.set_chunk_concepts(2, 7, &[100], 0.9).unwrap();
        db.set_chunk_concepts(3, 8, &[100], 1.0).unwrap();

        let ranked = db.chunks_for_concept_in_catalog(100, 7, 10).unwrap();
        assert_eq!(ranked.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 1]);
    }
}
