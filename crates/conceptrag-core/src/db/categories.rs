//! Category table operations

use super::rows::{parse_string_array, Category};
use super::vectors::{bytes_to_embedding, embedding_to_bytes};
use super::{encode_string_array, Database};
use crate::error::Result;
use crate::ids::normalize_name;
use rusqlite::{params, Row};

const CATEGORY_COLUMNS: &str = "id, category, description, parent_category_id, aliases, \
                                related_categories, document_count, chunk_count, concept_count, vector";

fn map_category_row(row: &Row) -> rusqlite::Result<Category> {
    let id: i64 = row.get(0)?;
    let parent: Option<i64> = row.get(3)?;
    let aliases: String = row.get(4)?;
    let related: String = row.get(5)?;
    let vector: Option<Vec<u8>> = row.get(9)?;
    Ok(Category {
        id: id as u32,
        category: row.get(1)?,
        description: row.get(2)?,
        parent_category_id: parent.map(|p| p as u32),
        aliases: parse_string_array(&aliases),
        related_categories: parse_string_array(&related),
        document_count: row.get::<_, i64>(6)? as u32,
        chunk_count: row.get::<_, i64>(7)? as u32,
        concept_count: row.get::<_, i64>(8)? as u32,
        vector: vector.map(|b| bytes_to_embedding(&b)).unwrap_or_default(),
    })
}

impl Database {
    /// Insert or replace a category
    pub fn upsert_category(&self, category: &Category) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO categories
             (id, category, description, parent_category_id, aliases, related_categories,
              document_count, chunk_count, concept_count, vector)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                category.id as i64,
                category.category,
                category.description,
                category.parent_category_id.map(|p| p as i64),
                encode_string_array(&category.aliases),
                encode_string_array(&category.related_categories),
                category.document_count as i64,
                category.chunk_count as i64,
                category.concept_count as i64,
                if category.vector.is_empty() {
                    None
                } else {
                    Some(embedding_to_bytes(&category.vector))
                },
            ],
        )?;
        Ok(())
    }

    /// Get a category by id
    pub fn get_category(&self, id: u32) -> Result<Option<Category>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM categories WHERE id = ?1", CATEGORY_COLUMNS),
            params![id as i64],
            map_category_row,
        );
        match result {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a category by exact normalized name
    pub fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {} FROM categories WHERE category = ?1",
                CATEGORY_COLUMNS
            ),
            params![normalize_name(name)],
            map_category_row,
        );
        match result {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a category carrying the given alias (case-insensitive)
    pub fn get_category_by_alias(&self, alias: &str) -> Result<Option<Category>> {
        let needle = normalize_name(alias);
        let all = self.scan_categories(usize::MAX >> 1)?;
        Ok(all
            .into_iter()
            .find(|c| c.aliases.iter().any(|a| normalize_name(a) == needle)))
    }

    /// Substring search over category names, shortest match first
    pub fn search_categories_by_name(&self, query: &str, limit: usize) -> Result<Vec<Category>> {
        let needle = normalize_name(query);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits: Vec<Category> = self
            .scan_categories(usize::MAX >> 1)?
            .into_iter()
            .filter(|c| c.category.contains(&needle))
            .collect();
        hits.sort_by(|a, b| {
            a.category
                .len()
                .cmp(&b.category.len())
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Scan categories, ordered by id for determinism
    pub fn scan_categories(&self, limit: usize) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM categories ORDER BY id LIMIT ?1",
            CATEGORY_COLUMNS
        ))?;
        let categories = stmt
            .query_map(params![limit as i64], map_category_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Direct children of a category
    pub fn category_children(&self, parent_id: u32) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM categories WHERE parent_category_id = ?1 ORDER BY id",
            CATEGORY_COLUMNS
        ))?;
        let categories = stmt
            .query_map(params![parent_id as i64], map_category_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Overwrite the denormalized counts (recomputed on rebuild only)
    pub fn set_category_counts(
        &self,
        id: u32,
        document_count: u32,
        chunk_count: u32,
        concept_count: u32,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE categories
             SET document_count = ?2, chunk_count = ?3, concept_count = ?4
             WHERE id = ?1",
            params![
                id as i64,
                document_count as i64,
                chunk_count as i64,
                concept_count as i64
            ],
        )?;
        Ok(())
    }

    /// Update a category description in place (summaries stage)
    pub fn set_category_description(&self, id: u32, description: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE categories SET description = ?2 WHERE id = ?1",
            params![id as i64, description],
        )?;
        Ok(())
    }

    /// Number of category rows
    pub fn count_categories(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn category(id: u32, name: &str, parent: Option<u32>) -> Category {
        Category {
            id,
            category: name.to_string(),
            description: String::new(),
            parent_category_id: parent,
            aliases: vec![],
            related_categories: vec![],
            document_count: 0,
            chunk_count: 0,
            concept_count: 0,
            vector: vec![],
        }
    }

    #[test]
    fn test_lookup_paths() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let mut c = category(1, "distributed systems", None);
        c.aliases = vec!["Distributed Computing".to_string()];
        db.upsert_category(&c).unwrap();

        assert!(db.get_category(1).unwrap().is_some());
        assert!(db
            .get_category_by_name("Distributed Systems")
            .unwrap()
            .is_some());
        assert!(db
            .get_category_by_alias("distributed computing")
            .unwrap()
            .is_some());
        assert!(db.get_category_by_alias("unknown").unwrap().is_none());
    }

    #[test]
    fn test_name_search_shortest_first() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.upsert_category(&category(1, "systems", None)).unwrap();
        db.upsert_category(&category(2, "distributed systems", None))
            .unwrap();
        db.upsert_category(&category(3, "databases", None)).unwrap();

        let hits = db.search_categories_by_name("systems", 5).unwrap();
        assert_eq!(hits.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(db.search_categories_by_name("", 5).unwrap().is_empty());
    }

    #[test]
    fn test_children() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.upsert_category(&category(1, "computing", None)).unwrap();
        db.upsert_category(&category(2, "databases", Some(1))).unwrap();
        db.upsert_category(&category(3, "networking", Some(1))).unwrap();

        let children = db.category_children(1).unwrap();
        assert_eq!(children.len(), 2);
        assert!(db.category_children(2).unwrap().is_empty());
    }
}
