//! Search engine module
//!
//! Query expansion, BM25 scoring, and the hybrid ranker over the three
//! searchable collections, plus the concept-driven, hierarchical, and
//! category retrieval paths.

pub mod ann;
mod bm25;
mod category;
mod concept;
mod expander;
mod hierarchical;
mod hybrid;
mod lexicon;

pub use ann::{AnnIndex, VectorCollection, VectorIndexes};
pub use bm25::{term_coverage, Bm25Score, Bm25Scorer, TokenizedDoc};
pub use category::{
    category_did_you_mean, category_documents, find_category_children, hierarchy_path,
    resolve_category,
};
pub use concept::{concept_chunks, ConceptChunkHit};
pub use expander::{
    expand_query, QueryExpansion, TermOrigin, WeightedTerm, CORPUS_WEIGHT, ORIGINAL_WEIGHT,
    RELATED_WEIGHT, SYNONYM_WEIGHT,
};
pub use hierarchical::{hierarchical_search, ChunkPreview, HierarchicalResult, SourceEntry};
pub use hybrid::{ChunkHit, HybridSearcher, RankedHit, ScoreBreakdown};
pub use lexicon::{LexEntry, Lexicon};

/// Lowercase alphanumeric tokenization used across scoring and the
/// deterministic embedder
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// A row rankable by the hybrid searcher
pub trait SearchDoc {
    /// Stable row id, used as the final tie-breaker
    fn doc_id(&self) -> u32;

    /// Title for the title component; rows without one score 0 there
    fn title(&self) -> Option<&str>;

    /// Text scored by the BM25 and WordNet components
    fn search_text(&self) -> String;
}

impl SearchDoc for crate::db::CatalogEntry {
    fn doc_id(&self) -> u32 {
        self.id
    }

    fn title(&self) -> Option<&str> {
        Some(&self.title)
    }

    fn search_text(&self) -> String {
        format!("{}\n{}", self.title, self.summary)
    }
}

impl SearchDoc for crate::db::Concept {
    fn doc_id(&self) -> u32 {
        self.id
    }

    fn title(&self) -> Option<&str> {
        Some(&self.concept)
    }

    fn search_text(&self) -> String {
        format!("{}\n{}", self.concept, self.summary)
    }
}
