//! Concept-driven chunk lookup
//!
//! The hot path for "show me things about X": resolve the concept
//! through the ID cache, vector-search the chunks table with the
//! concept's own embedding, then verify exact concept membership on the
//! over-fetched candidates. O(log n + limit) instead of a full scan.

use super::ann::{VectorCollection, VectorIndexes};
use crate::cache::ConceptIdCache;
use crate::db::{Chunk, Database};
use crate::error::Result;

/// Candidate over-fetch factor before the verification filter
const VERIFY_OVER_FETCH: usize = 3;

/// A chunk returned from concept lookup with its vector distance
#[derive(Debug, Clone)]
pub struct ConceptChunkHit {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Chunks tagged with the named concept, nearest first. An unknown
/// concept yields an empty result, not an error.
pub fn concept_chunks(
    db: &Database,
    indexes: &VectorIndexes,
    ids: &ConceptIdCache,
    concept_name: &str,
    limit: usize,
) -> Result<(Option<u32>, Vec<ConceptChunkHit>)> {
    let Some(concept_id) = ids.concepts.get_id(concept_name) else {
        tracing::debug!(concept = concept_name, "concept not in id cache");
        return Ok((None, Vec::new()));
    };

    let Some(concept) = db.get_concept(concept_id)? else {
        // Cache and table disagree; treat as missing rather than fatal
        tracing::warn!(concept_id, "concept in cache but absent from store");
        return Ok((Some(concept_id), Vec::new()));
    };

    if concept.vector.is_empty() {
        return Ok((Some(concept_id), Vec::new()));
    }

    let candidates = indexes.search(
        db,
        VectorCollection::Chunks,
        &concept.vector,
        limit * VERIFY_OVER_FETCH,
    )?;

    // Verification step: exact membership of the concept id
    let mut hits = Vec::with_capacity(limit);
    for (chunk_id, distance) in candidates {
        if hits.len() >= limit {
            break;
        }
        let Some(chunk) = db.get_chunk(chunk_id)? else {
            continue;
        };
        if chunk.concept_ids.contains(&concept_id) {
            hits.push(ConceptChunkHit { chunk, distance });
        }
    }

    Ok((Some(concept_id), hits))
}
