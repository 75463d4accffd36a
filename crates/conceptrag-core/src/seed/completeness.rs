//! Per-document completeness tracking
//!
//! Decides which pieces of a document need regenerating on resume.
//! Chunks are never deleted when intact (they are expensive to rebuild);
//! summaries and concepts regenerate independently.

use crate::db::Database;
use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;

/// What a document already has in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocCompleteness {
    pub has_catalog: bool,
    pub has_summary: bool,
    pub has_concepts: bool,
    pub has_chunks: bool,
}

impl DocCompleteness {
    pub fn is_complete(&self) -> bool {
        self.has_catalog && self.has_summary && self.has_concepts && self.has_chunks
    }
}

lazy_static! {
    static ref FALLBACK_OVERVIEW: Regex =
        Regex::new(r"^Document overview \(\d+ pages?\)$").expect("static pattern");
}

/// A summary counts only if it is not a short fallback
pub fn summary_is_valid(summary: &str) -> bool {
    let summary = summary.trim();
    if summary.len() < 10 {
        return false;
    }
    if FALLBACK_OVERVIEW.is_match(summary) {
        return false;
    }
    if summary.contains("summarization failed") {
        return false;
    }
    true
}

/// Inspect what the store already holds for a catalog id
pub fn check_document(db: &Database, catalog_id: u32) -> Result<DocCompleteness> {
    let Some(entry) = db.get_catalog_entry(catalog_id)? else {
        return Ok(DocCompleteness {
            has_catalog: false,
            has_summary: false,
            has_concepts: false,
            has_chunks: false,
        });
    };

    let chunks = db.chunks_for_catalog(catalog_id)?;
    let has_chunks = !chunks.is_empty();
    let has_concepts = chunks.iter().any(|c| !c.concept_ids.is_empty());

    Ok(DocCompleteness {
        has_catalog: true,
        has_summary: summary_is_valid(&entry.summary),
        has_concepts,
        has_chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CatalogEntry, Chunk, DocType};

    #[test]
    fn test_summary_validity() {
        assert!(summary_is_valid(
            "Covers consensus, replication, and partitioning in depth."
        ));
        assert!(!summary_is_valid("short"));
        assert!(!summary_is_valid(""));
        assert!(!summary_is_valid("Document overview (12 pages)"));
        assert!(!summary_is_valid("Document overview (1 page)"));
        assert!(!summary_is_valid(
            "Note: summarization failed for this document"
        ));
        // The fallback pattern only matches exactly
        assert!(summary_is_valid(
            "Document overview (12 pages) plus a real description of content."
        ));
    }

    #[test]
    fn test_check_document() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.upsert_catalog_entry(&CatalogEntry {
            id: 1,
            source: "a".into(),
            hash: "h".into(),
            title: "A".into(),
            summary: "A genuinely descriptive summary of the document.".into(),
            doc_type: DocType::Book,
            category_ids: vec![],
            vector: vec![],
            complete: false,
        })
        .unwrap();

        let before = check_document(&db, 1).unwrap();
        assert!(before.has_catalog && before.has_summary);
        assert!(!before.has_chunks && !before.has_concepts);
        assert!(!before.is_complete());

        db.upsert_chunk(&Chunk {
            id: 10,
            catalog_id: 1,
            text: "chunk".into(),
            vector: vec![],
            concept_ids: vec![5],
            concept_density: Some(0.2),
            page_number: None,
            token_count: 1,
            byte_offset: 0,
        })
        .unwrap();

        let after = check_document(&db, 1).unwrap();
        assert!(after.is_complete());

        let missing = check_document(&db, 99).unwrap();
        assert!(!missing.has_catalog);
    }
}
