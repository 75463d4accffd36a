//! Hierarchical concept retrieval
//!
//! Concept -> source documents -> concept-dense chunks, assembled into
//! one result a downstream agent can walk top-down.

use crate::cache::ConceptIdCache;
use crate::db::Database;
use crate::error::{ConceptRagError, Result};

/// Preview length for chunk text
const PREVIEW_CHARS: usize = 280;

/// Chunk preview inside a source entry
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChunkPreview {
    pub chunk_id: u32,
    pub preview: String,
    pub page_number: Option<u32>,
    pub concept_density: Option<f64>,
}

/// One source document with its densest chunks
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceEntry {
    pub catalog_id: u32,
    pub title: String,
    pub summary: String,
    pub chunks: Vec<ChunkPreview>,
}

/// Assembled hierarchical result
#[derive(Debug, Clone, serde::Serialize)]
pub struct HierarchicalResult {
    pub concept_id: u32,
    pub concept: String,
    pub summary: String,
    pub related_concepts: Vec<String>,
    pub synonyms: Vec<String>,
    pub sources: Vec<SourceEntry>,
    pub total_chunks: usize,
}

fn preview(text: &str) -> String {
    if text.len() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut end = PREVIEW_CHARS;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

/// Resolve a concept and assemble its sources and densest chunks.
/// Fails with `ConceptNotFound` when the name does not resolve.
pub fn hierarchical_search(
    db: &Database,
    ids: &ConceptIdCache,
    concept_name: &str,
    max_sources: usize,
    max_chunks: usize,
) -> Result<HierarchicalResult> {
    let concept_id = ids
        .concepts
        .get_id(concept_name)
        .ok_or_else(|| ConceptRagError::ConceptNotFound(concept_name.to_string()))?;
    let concept = db
        .get_concept(concept_id)?
        .ok_or_else(|| ConceptRagError::ConceptNotFound(concept_name.to_string()))?;

    // Stale catalog ids are dropped silently, like stale concept ids
    let mut sources = Vec::new();
    for catalog_id in &concept.catalog_ids {
        if sources.len() >= max_sources {
            break;
        }
        if let Some(entry) = db.get_catalog_entry(*catalog_id)? {
            sources.push(entry);
        }
    }

    let per_source = (max_chunks / sources.len().max(1)).max(1);
    let mut source_entries = Vec::with_capacity(sources.len());
    for entry in sources {
        let chunks = db
            .chunks_for_concept_in_catalog(concept_id, entry.id, per_source)?
            .into_iter()
            .map(|c| ChunkPreview {
                chunk_id: c.id,
                preview: preview(&c.text),
                page_number: c.page_number,
                concept_density: c.concept_density,
            })
            .collect();
        source_entries.push(SourceEntry {
            catalog_id: entry.id,
            title: entry.title,
            summary: entry.summary,
            chunks,
        });
    }

    let total_chunks = db.count_chunks_for_concept(concept_id)?;
    let related_concepts = ids.concepts.get_names(&concept.related_concept_ids);

    Ok(HierarchicalResult {
        concept_id,
        concept: concept.concept,
        summary: concept.summary,
        related_concepts,
        synonyms: concept.synonyms,
        sources: source_entries,
        total_chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CatalogEntry, Chunk, Concept, DocType};

    fn seeded() -> (Database, ConceptIdCache) {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        for (id, title) in [(1u32, "Gateway Patterns"), (2, "Modern Infrastructure")] {
            db.upsert_catalog_entry(&CatalogEntry {
                id,
                source: format!("books/{}.txt", id),
                hash: format!("h{}", id),
                title: title.to_string(),
                summary: format!("{} summary", title),
                doc_type: DocType::Book,
                category_ids: vec![],
                vector: vec![],
                complete: true,
            })
            .unwrap();
        }

        db.upsert_concept(&Concept {
            id: 7,
            concept: "api gateway".to_string(),
            summary: "routing layer".to_string(),
            catalog_ids: vec![1, 2, 999],
            related_concept_ids: vec![8, 555],
            synonyms: vec!["edge proxy".to_string()],
            broader_terms: vec![],
            narrower_terms: vec![],
            vector: vec![],
            weight: 0.9,
        })
        .unwrap();
        db.upsert_concept(&Concept {
            id: 8,
            concept: "load balancing".to_string(),
            summary: String::new(),
            catalog_ids: vec![],
            related_concept_ids: vec![],
            synonyms: vec![],
            broader_terms: vec![],
            narrower_terms: vec![],
            vector: vec![],
            weight: 0.3,
        })
        .unwrap();

        let mut chunk_id = 100u32;
        for (catalog_id, density) in [(1u32, 0.8), (1, 0.3), (2, 0.5)] {
            db.upsert_chunk(&Chunk {
                id: chunk_id,
                catalog_id,
                text: format!("chunk {} about the api gateway", chunk_id),
                vector: vec![],
                concept_ids: vec![7],
                concept_density: Some(density),
                page_number: Some(chunk_id),
                token_count: 6,
                byte_offset: 0,
            })
            .unwrap();
            db.set_chunk_concepts(chunk_id, catalog_id, &[7], density)
                .unwrap();
            chunk_id += 1;
        }

        let ids = ConceptIdCache::build(&db).unwrap();
        (db, ids)
    }

    #[test]
    fn test_assembles_sources_and_chunks() {
        let (db, ids) = seeded();
        let result = hierarchical_search(&db, &ids, "API Gateway", 5, 10).unwrap();

        assert_eq!(result.concept_id, 7);
        assert_eq!(result.concept, "api gateway");
        // Catalog id 999 does not exist and is dropped
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.total_chunks, 3);
        // Related id 555 is stale and dropped by the cache
        assert_eq!(result.related_concepts, vec!["load balancing".to_string()]);
        assert_eq!(result.synonyms, vec!["edge proxy".to_string()]);

        // Densest chunk first within each source
        let first = &result.sources[0];
        assert_eq!(first.catalog_id, 1);
        assert_eq!(first.chunks[0].chunk_id, 100);
        assert_eq!(first.chunks[0].concept_density, Some(0.8));
    }

    #[test]
    fn test_max_sources_bounds_result() {
        let (db, ids) = seeded();
        let result = hierarchical_search(&db, &ids, "api gateway", 1, 10).unwrap();
        assert_eq!(result.sources.len(), 1);
        // Total still counts every tagged chunk
        assert_eq!(result.total_chunks, 3);
    }

    #[test]
    fn test_missing_concept_fails() {
        let (db, ids) = seeded();
        let err = hierarchical_search(&db, &ids, "zanzibar", 5, 10).unwrap_err();
        assert!(matches!(err, ConceptRagError::ConceptNotFound(_)));
    }
}
