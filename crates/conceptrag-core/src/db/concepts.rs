//! Concept table operations

use super::rows::{parse_id_array, parse_string_array, Concept};
use super::vectors::{bytes_to_embedding, embedding_to_bytes};
use super::{encode_id_array, encode_string_array, Database, Predicate};
use crate::error::Result;
use crate::ids::normalize_name;
use rusqlite::{params, Row};

const CONCEPT_COLUMNS: &str = "id, concept, summary, catalog_ids, related_concept_ids, synonyms, \
                               broader_terms, narrower_terms, vector, weight";

fn map_concept_row(row: &Row) -> rusqlite::Result<Concept> {
    let id: i64 = row.get(0)?;
    let catalog_ids: String = row.get(3)?;
    let related: String = row.get(4)?;
    let synonyms: String = row.get(5)?;
    let broader: String = row.get(6)?;
    let narrower: String = row.get(7)?;
    let vector: Option<Vec<u8>> = row.get(8)?;
    Ok(Concept {
        id: id as u32,
        concept: row.get(1)?,
        summary: row.get(2)?,
        catalog_ids: parse_id_array(&catalog_ids),
        related_concept_ids: parse_id_array(&related),
        synonyms: parse_string_array(&synonyms),
        broader_terms: parse_string_array(&broader),
        narrower_terms: parse_string_array(&narrower),
        vector: vector.map(|b| bytes_to_embedding(&b)).unwrap_or_default(),
        weight: row.get(9)?,
    })
}

impl Database {
    /// Insert or replace a concept
    pub fn upsert_concept(&self, concept: &Concept) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO concepts
             (id, concept, summary, catalog_ids, related_concept_ids, synonyms,
              broader_terms, narrower_terms, vector, weight)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                concept.id as i64,
                concept.concept,
                concept.summary,
                encode_id_array(&concept.catalog_ids),
                encode_id_array(&concept.related_concept_ids),
                encode_string_array(&concept.synonyms),
                encode_string_array(&concept.broader_terms),
                encode_string_array(&concept.narrower_terms),
                if concept.vector.is_empty() {
                    None
                } else {
                    Some(embedding_to_bytes(&concept.vector))
                },
                concept.weight,
            ],
        )?;
        Ok(())
    }

    /// Get a concept by id
    pub fn get_concept(&self, id: u32) -> Result<Option<Concept>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM concepts WHERE id = ?1", CONCEPT_COLUMNS),
            params![id as i64],
            map_concept_row,
        );
        match result {
            Ok(concept) => Ok(Some(concept)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a concept by normalized name
    pub fn get_concept_by_name(&self, name: &str) -> Result<Option<Concept>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM concepts WHERE concept = ?1", CONCEPT_COLUMNS),
            params![normalize_name(name)],
            map_concept_row,
        );
        match result {
            Ok(concept) => Ok(Some(concept)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Scan concepts, ordered by id for determinism
    pub fn scan_concepts(&self, limit: usize) -> Result<Vec<Concept>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM concepts ORDER BY id LIMIT ?1",
            CONCEPT_COLUMNS
        ))?;
        let concepts = stmt
            .query_map(params![limit as i64], map_concept_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(concepts)
    }

    /// Filtered concept scan via the typed predicate builder
    pub fn where_concepts(&self, predicate: &Predicate, limit: usize) -> Result<Vec<Concept>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM concepts WHERE {} ORDER BY id LIMIT ?1",
            CONCEPT_COLUMNS,
            predicate.to_sql()
        ))?;
        let concepts = stmt
            .query_map(params![limit as i64], map_concept_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(concepts)
    }

    /// All concept (id, vector) pairs with a stored embedding
    pub fn concept_vectors(&self) -> Result<Vec<(u32, Vec<f32>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, vector FROM concepts WHERE vector IS NOT NULL")?;
        let vectors = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                Ok((id as u32, bytes_to_embedding(&bytes)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vectors)
    }

    /// Concepts appearing in a document
    pub fn concepts_for_catalog(&self, catalog_id: u32) -> Result<Vec<Concept>> {
        let all = self.scan_concepts(usize::MAX >> 1)?;
        Ok(all
            .into_iter()
            .filter(|c| c.catalog_ids.contains(&catalog_id))
            .collect())
    }

    /// Drop all concepts; the concepts stage rebuilds the table from the
    /// full catalog so the index is never partial
    pub fn clear_concepts(&self) -> Result<()> {
        self.conn.execute("DELETE FROM concepts", [])?;
        Ok(())
    }

    /// Update a concept summary in place (summaries stage)
    pub fn set_concept_summary(&self, id: u32, summary: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE concepts SET summary = ?2 WHERE id = ?1",
            params![id as i64, summary],
        )?;
        Ok(())
    }

    /// Number of concept rows
    pub fn count_concepts(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM concepts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn concept(id: u32, name: &str) -> Concept {
        Concept {
            id,
            concept: name.to_string(),
            summary: format!("about {}", name),
            catalog_ids: vec![1],
            related_concept_ids: vec![],
            synonyms: vec![],
            broader_terms: vec![],
            narrower_terms: vec![],
            vector: vec![0.1, 0.2],
            weight: 0.5,
        }
    }

    #[test]
    fn test_upsert_and_lookup_by_name() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.upsert_concept(&concept(42, "api gateway")).unwrap();

        let by_id = db.get_concept(42).unwrap().unwrap();
        assert_eq!(by_id.concept, "api gateway");

        // Lookup normalizes case and whitespace
        let by_name = db.get_concept_by_name("  API Gateway ").unwrap().unwrap();
        assert_eq!(by_name.id, 42);

        assert!(db.get_concept_by_name("missing").unwrap().is_none());
    }

    #[test]
    fn test_concepts_for_catalog() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let mut a = concept(1, "sharding");
        a.catalog_ids = vec![10, 11];
        let mut b = concept(2, "replication");
        b.catalog_ids = vec![11];
        db.upsert_concept(&a).unwrap();
        db.upsert_concept(&b).unwrap();

        assert_eq!(db.concepts_for_catalog(10).unwrap().len(), 1);
        assert_eq!(db.concepts_for_catalog(11).unwrap().len(), 2);
    }

    #[test]
    fn test_clear_concepts() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.upsert_concept(&concept(1, "a")).unwrap();
        db.clear_concepts().unwrap();
        assert_eq!(db.count_concepts().unwrap(), 0);
    }
}
