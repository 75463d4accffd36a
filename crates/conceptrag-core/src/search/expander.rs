//! Query expansion
//!
//! Expands a query into three weighted term lists: the original tokens,
//! concept names from the corpus whose embeddings sit close to the query
//! embedding, and lexicon-derived synonyms and hypernym/hyponym terms.
//! Given a fixed concept table the expansion is pure.

use super::ann::{VectorCollection, VectorIndexes};
use super::lexicon::Lexicon;
use super::tokenize;
use crate::cache::ConceptIdCache;
use crate::db::Database;
use crate::embed::CachedEmbedder;
use crate::error::Result;
use std::collections::HashMap;

/// Weight of original query tokens
pub const ORIGINAL_WEIGHT: f64 = 1.0;
/// Weight of corpus-matched concept names
pub const CORPUS_WEIGHT: f64 = 0.6;
/// Weight of lexical synonyms
pub const SYNONYM_WEIGHT: f64 = 0.4;
/// Weight of hypernym/hyponym terms
pub const RELATED_WEIGHT: f64 = 0.3;

/// Concept names considered per query
const CORPUS_TOP_K: usize = 5;
/// Minimum cosine similarity for a corpus match
const CORPUS_MIN_SIMILARITY: f32 = 0.5;

/// Where an expanded term came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOrigin {
    Original,
    Corpus,
    WordNet,
}

/// One expanded term with its contribution weight
#[derive(Debug, Clone)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
    pub origin: TermOrigin,
}

/// Full expansion of one query
#[derive(Debug, Clone, Default)]
pub struct QueryExpansion {
    pub original: Vec<WeightedTerm>,
    pub corpus: Vec<WeightedTerm>,
    pub wordnet: Vec<WeightedTerm>,
    /// Union of all terms in expansion order
    pub all_terms: Vec<String>,
    /// Term -> weight; on duplicates the higher weight wins
    pub weights: HashMap<String, f64>,
}

impl QueryExpansion {
    pub fn is_empty(&self) -> bool {
        self.all_terms.is_empty()
    }

    fn push(&mut self, term: WeightedTerm) {
        let entry = self.weights.entry(term.term.clone()).or_insert(0.0);
        if term.weight > *entry {
            *entry = term.weight;
        }
        // First origin wins; duplicates only refresh the weight
        if self.all_terms.contains(&term.term) {
            return;
        }
        self.all_terms.push(term.term.clone());
        match term.origin {
            TermOrigin::Original => self.original.push(term),
            TermOrigin::Corpus => self.corpus.push(term),
            TermOrigin::WordNet => self.wordnet.push(term),
        }
    }
}

/// Expand a query against the concept table and the embedded lexicon
pub async fn expand_query(
    query: &str,
    embedder: &CachedEmbedder,
    db: &Database,
    indexes: &VectorIndexes,
    ids: &ConceptIdCache,
    lexicon: &Lexicon,
) -> Result<QueryExpansion> {
    let mut expansion = QueryExpansion::default();

    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Ok(expansion);
    }

    for token in &tokens {
        expansion.push(WeightedTerm {
            term: token.clone(),
            weight: ORIGINAL_WEIGHT,
            origin: TermOrigin::Original,
        });
    }

    // Corpus terms: concept names near the query embedding
    let embedded = embedder.embed_or_degrade(query).await;
    if !embedded.degraded {
        let neighbors = indexes.search(
            db,
            VectorCollection::Concepts,
            &embedded.vector,
            CORPUS_TOP_K,
        )?;
        for (concept_id, distance) in neighbors {
            let similarity = 1.0 - distance;
            if similarity < CORPUS_MIN_SIMILARITY {
                continue;
            }
            if let Some(name) = ids.concepts.get_name(concept_id) {
                expansion.push(WeightedTerm {
                    term: name.to_string(),
                    weight: CORPUS_WEIGHT,
                    origin: TermOrigin::Corpus,
                });
            }
        }
    }

    // Lexical terms from the original tokens
    for token in &tokens {
        for synonym in lexicon.synonyms(token) {
            expansion.push(WeightedTerm {
                term: (*synonym).to_string(),
                weight: SYNONYM_WEIGHT,
                origin: TermOrigin::WordNet,
            });
        }
        for related in lexicon.related(token) {
            expansion.push(WeightedTerm {
                term: related.to_string(),
                weight: RELATED_WEIGHT,
                origin: TermOrigin::WordNet,
            });
        }
    }

    Ok(expansion)
}
