//! Hybrid ranking
//!
//! Combines vector similarity, BM25, title match, and WordNet term
//! coverage into one score with fixed per-collection weights. Candidate
//! rows come from an over-fetched vector search; a degraded (zero)
//! query vector removes the vector component and renormalizes the
//! remaining weights over a table scan instead.

use super::ann::{VectorCollection, VectorIndexes};
use super::bm25::{term_coverage, Bm25Scorer, TokenizedDoc};
use super::expander::{expand_query, QueryExpansion};
use super::lexicon::Lexicon;
use super::SearchDoc;
use crate::cache::ConceptIdCache;
use crate::config::{Bm25Config, HybridWeights, HybridWeightsConfig};
use crate::db::vectors::{cosine_distance, is_zero_vector};
use crate::db::{CatalogEntry, Chunk, Concept, Database, Predicate};
use crate::embed::CachedEmbedder;
use crate::error::{ConceptRagError, Result};
use std::collections::HashMap;

/// Vector-search over-fetch factor
const OVER_FETCH: usize = 3;

/// Scan bound when ranking without a usable query vector
const DEGRADED_SCAN_LIMIT: usize = 10_000;

/// Component scores, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct ScoreBreakdown {
    pub vector: f64,
    pub bm25: f64,
    pub title: f64,
    pub wordnet: f64,
}

/// One ranked row with its hybrid score
#[derive(Debug, Clone)]
pub struct RankedHit<T> {
    pub item: T,
    pub score: f64,
    pub components: ScoreBreakdown,
}

/// A chunk candidate carrying its document title for the title
/// component
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub chunk: Chunk,
    pub catalog_title: String,
    pub source: String,
}

impl SearchDoc for ChunkHit {
    fn doc_id(&self) -> u32 {
        self.chunk.id
    }

    fn title(&self) -> Option<&str> {
        if self.catalog_title.is_empty() {
            None
        } else {
            Some(&self.catalog_title)
        }
    }

    fn search_text(&self) -> String {
        self.chunk.text.clone()
    }
}

/// Fraction of original query terms appearing in the title with word
/// boundaries
fn title_score(title: Option<&str>, expansion: &QueryExpansion) -> f64 {
    let Some(title) = title else {
        return 0.0;
    };
    if expansion.original.is_empty() {
        return 0.0;
    }
    let doc = TokenizedDoc::new(title);
    let matched = expansion
        .original
        .iter()
        .filter(|t| doc.contains_phrase(&t.term))
        .count();
    matched as f64 / expansion.original.len() as f64
}

/// Rank candidates deterministically: hybrid score descending, vector
/// score descending, row id ascending.
fn rank<T: SearchDoc>(
    candidates: Vec<(T, Option<f32>)>,
    expansion: &QueryExpansion,
    weights: HybridWeights,
    bm25: &Bm25Scorer,
    vector_usable: bool,
    limit: usize,
) -> Vec<RankedHit<T>> {
    // Remove the vector component and renormalize when the query vector
    // is unusable
    let (w_vector, scale) = if vector_usable {
        (weights.vector, 1.0)
    } else {
        let rest = weights.bm25 + weights.title + weights.wordnet;
        (0.0, if rest > 0.0 { 1.0 / rest } else { 0.0 })
    };

    let wordnet_terms: Vec<String> = expansion
        .wordnet
        .iter()
        .map(|t| t.term.clone())
        .collect();

    let mut hits: Vec<RankedHit<T>> = candidates
        .into_iter()
        .map(|(item, distance)| {
            let vector = match distance {
                Some(d) if vector_usable => 1.0 - f64::from(d.clamp(0.0, 1.0)),
                _ => 0.0,
            };
            let doc = TokenizedDoc::new(&item.search_text());
            let bm25_score = bm25.score(&doc, expansion);
            let title = title_score(item.title(), expansion);
            let wordnet = term_coverage(&doc, &wordnet_terms);

            let score = if vector_usable {
                w_vector * vector
                    + weights.bm25 * bm25_score.score
                    + weights.title * title
                    + weights.wordnet * wordnet
            } else {
                (weights.bm25 * bm25_score.score
                    + weights.title * title
                    + weights.wordnet * wordnet)
                    * scale
            };

            RankedHit {
                item,
                score,
                components: ScoreBreakdown {
                    vector,
                    bm25: bm25_score.score,
                    title,
                    wordnet,
                },
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.components
                    .vector
                    .partial_cmp(&a.components.vector)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.item.doc_id().cmp(&b.item.doc_id()))
    });
    hits.truncate(limit);
    hits
}

/// Hybrid search over the three collections
pub struct HybridSearcher<'a> {
    pub db: &'a Database,
    pub indexes: &'a VectorIndexes,
    pub embedder: &'a CachedEmbedder,
    pub ids: &'a ConceptIdCache,
    pub lexicon: &'a Lexicon,
    pub weights: &'a HybridWeightsConfig,
    pub bm25: Bm25Scorer,
}

impl<'a> HybridSearcher<'a> {
    pub fn new(
        db: &'a Database,
        indexes: &'a VectorIndexes,
        embedder: &'a CachedEmbedder,
        ids: &'a ConceptIdCache,
        lexicon: &'a Lexicon,
        weights: &'a HybridWeightsConfig,
        bm25_config: Bm25Config,
    ) -> Self {
        Self {
            db,
            indexes,
            embedder,
            ids,
            lexicon,
            weights,
            bm25: Bm25Scorer::new(bm25_config),
        }
    }

    async fn prepare(&self, query: &str) -> Result<Option<(QueryExpansion, Vec<f32>, bool)>> {
        let expansion = expand_query(
            query,
            self.embedder,
            self.db,
            self.indexes,
            self.ids,
            self.lexicon,
        )
        .await?;
        if expansion.is_empty() {
            return Ok(None);
        }

        let embedded = self.embedder.embed_or_degrade(query).await;
        let usable = !embedded.degraded && !is_zero_vector(&embedded.vector);
        Ok(Some((expansion, embedded.vector, usable)))
    }

    /// Hybrid ranking over catalog entries
    pub async fn search_catalog(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedHit<CatalogEntry>>> {
        if limit == 0 {
            return Err(ConceptRagError::Validation("limit must be positive".into()));
        }
        let Some((expansion, vector, usable)) = self.prepare(query).await? else {
            return Ok(Vec::new());
        };

        let candidates: Vec<(CatalogEntry, Option<f32>)> = if usable {
            let neighbors =
                self.indexes
                    .search(self.db, VectorCollection::Catalog, &vector, limit * OVER_FETCH)?;
            let mut rows = Vec::with_capacity(neighbors.len());
            for (id, distance) in neighbors {
                if let Some(entry) = self.db.get_catalog_entry(id)? {
                    rows.push((entry, Some(distance)));
                }
            }
            rows
        } else {
            self.db
                .scan_catalog(DEGRADED_SCAN_LIMIT)?
                .into_iter()
                .map(|e| (e, None))
                .collect()
        };

        Ok(rank(candidates, &expansion, self.weights.catalog, &self.bm25, usable, limit))
    }

    /// Hybrid ranking over chunks, optionally scoped to one source
    pub async fn search_chunks(
        &self,
        query: &str,
        source: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RankedHit<ChunkHit>>> {
        if limit == 0 {
            return Err(ConceptRagError::Validation("limit must be positive".into()));
        }
        let Some((expansion, vector, usable)) = self.prepare(query).await? else {
            return Ok(Vec::new());
        };

        let scope = match source {
            Some(source) => {
                let Some(entry) = self.db.get_catalog_by_source(source)? else {
                    return Err(ConceptRagError::SourceNotFound(source.to_string()));
                };
                Some(entry)
            }
            None => None,
        };

        let raw: Vec<(Chunk, Option<f32>)> = match (&scope, usable) {
            (Some(entry), _) => {
                // Scoped search ranks the document's own chunks; the
                // distance is computed directly instead of via ANN
                self.db
                    .where_chunks(&Predicate::eq_id("catalog_id", entry.id), DEGRADED_SCAN_LIMIT)?
                    .into_iter()
                    .map(|c| {
                        let distance = if usable && !c.vector.is_empty() {
                            Some(cosine_distance(&vector, &c.vector))
                        } else {
                            None
                        };
                        (c, distance)
                    })
                    .collect()
            }
            (None, true) => {
                let neighbors = self.indexes.search(
                    self.db,
                    VectorCollection::Chunks,
                    &vector,
                    limit * OVER_FETCH,
                )?;
                let mut rows = Vec::with_capacity(neighbors.len());
                for (id, distance) in neighbors {
                    if let Some(chunk) = self.db.get_chunk(id)? {
                        rows.push((chunk, Some(distance)));
                    }
                }
                rows
            }
            (None, false) => self
                .db
                .scan_chunks(DEGRADED_SCAN_LIMIT)?
                .into_iter()
                .map(|c| (c, None))
                .collect(),
        };

        // Attach document titles for the title component
        let mut titles: HashMap<u32, (String, String)> = HashMap::new();
        let mut candidates = Vec::with_capacity(raw.len());
        for (chunk, distance) in raw {
            let (title, source) = match titles.get(&chunk.catalog_id) {
                Some(pair) => pair.clone(),
                None => {
                    let pair = self
                        .db
                        .get_catalog_entry(chunk.catalog_id)?
                        .map(|e| (e.title, e.source))
                        .unwrap_or_default();
                    titles.insert(chunk.catalog_id, pair.clone());
                    pair
                }
            };
            candidates.push((
                ChunkHit {
                    chunk,
                    catalog_title: title,
                    source,
                },
                distance,
            ));
        }

        Ok(rank(candidates, &expansion, self.weights.chunks, &self.bm25, usable, limit))
    }

    /// Hybrid ranking over concepts
    pub async fn search_concepts(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RankedHit<Concept>>> {
        if limit == 0 {
            return Err(ConceptRagError::Validation("limit must be positive".into()));
        }
        let Some((expansion, vector, usable)) = self.prepare(query).await? else {
            return Ok(Vec::new());
        };

        let candidates: Vec<(Concept, Option<f32>)> = if usable {
            let neighbors = self.indexes.search(
                self.db,
                VectorCollection::Concepts,
                &vector,
                limit * OVER_FETCH,
            )?;
            let mut rows = Vec::with_capacity(neighbors.len());
            for (id, distance) in neighbors {
                if let Some(concept) = self.db.get_concept(id)? {
                    rows.push((concept, Some(distance)));
                }
            }
            rows
        } else {
            self.db
                .scan_concepts(DEGRADED_SCAN_LIMIT)?
                .into_iter()
                .map(|c| (c, None))
                .collect()
        };

        Ok(rank(candidates, &expansion, self.weights.concepts, &self.bm25, usable, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ConceptIdCache;
    use crate::db::DocType;
    use crate::embed::{Embedder, HashEmbedder};
    use std::sync::Arc;
    use std::time::Duration;

    async fn catalog_entry(id: u32, source: &str, title: &str, summary: &str) -> CatalogEntry {
        let vector = HashEmbedder::new()
            .embed(&format!("{}\n{}", title, summary))
            .await
            .unwrap();
        CatalogEntry {
            id,
            source: source.to_string(),
            hash: format!("h{}", id),
            title: title.to_string(),
            summary: summary.to_string(),
            doc_type: DocType::Book,
            category_ids: vec![],
            vector,
            complete: true,
        }
    }

    struct Fixture {
        db: Database,
        indexes: VectorIndexes,
        embedder: CachedEmbedder,
        ids: ConceptIdCache,
        lexicon: Lexicon,
        weights: HybridWeightsConfig,
    }

    impl Fixture {
        fn searcher(&self) -> HybridSearcher<'_> {
            HybridSearcher::new(
                &self.db,
                &self.indexes,
                &self.embedder,
                &self.ids,
                &self.lexicon,
                &self.weights,
                Bm25Config::default(),
            )
        }
    }

    async fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        db.upsert_catalog_entry(
            &catalog_entry(
                1,
                "books/distributed-systems.txt",
                "Distributed Systems",
                "Consensus, replication, and fault tolerance in distributed systems.",
            )
            .await,
        )
        .unwrap();
        db.upsert_catalog_entry(
            &catalog_entry(
                2,
                "books/systems-thinking.txt",
                "Systems Thinking",
                "Feedback loops and mental models for understanding systems.",
            )
            .await,
        )
        .unwrap();
        db.upsert_catalog_entry(
            &catalog_entry(
                3,
                "books/clean-code.txt",
                "Clean Code",
                "Writing readable and maintainable functions.",
            )
            .await,
        )
        .unwrap();

        let ids = ConceptIdCache::build(&db).unwrap();
        Fixture {
            indexes: VectorIndexes::build(&db).unwrap(),
            db,
            embedder: CachedEmbedder::new(
                Arc::new(HashEmbedder::new()),
                64,
                Duration::from_secs(60),
            ),
            ids,
            lexicon: Lexicon::new(),
            weights: HybridWeightsConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_catalog_ranking_title_and_coverage_win() {
        let f = fixture().await;
        let hits = f
            .searcher()
            .search_catalog("Distributed Systems", 3)
            .await
            .unwrap();

        assert_eq!(hits.len(), 3);
        // Full title + term coverage puts the exact-title doc strictly first
        assert_eq!(hits[0].item.id, 1);
        assert!((hits[0].components.title - 1.0).abs() < 1e-9);
        assert!(hits[0].score > hits[1].score);
        // Partial overlap ("systems") beats no overlap
        assert_eq!(hits[1].item.id, 2);
        assert!(hits[1].score > hits[2].score);
        assert_eq!(hits[2].item.id, 3);
    }

    #[tokio::test]
    async fn test_empty_query_returns_empty() {
        let f = fixture().await;
        let hits = f.searcher().search_catalog("", 5).await.unwrap();
        assert!(hits.is_empty());
        let hits = f.searcher().search_catalog("   ", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_ranking_is_deterministic() {
        let f = fixture().await;
        let a = f.searcher().search_catalog("systems", 3).await.unwrap();
        let b = f.searcher().search_catalog("systems", 3).await.unwrap();
        let ids_a: Vec<u32> = a.iter().map(|h| h.item.id).collect();
        let ids_b: Vec<u32> = b.iter().map(|h| h.item.id).collect();
        assert_eq!(ids_a, ids_b);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.score, y.score);
        }
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let f = fixture().await;
        let err = f.searcher().search_catalog("systems", 0).await.unwrap_err();
        assert!(matches!(err, ConceptRagError::Validation(_)));
    }

    #[tokio::test]
    async fn test_scoped_chunk_search_unknown_source() {
        let f = fixture().await;
        let err = f
            .searcher()
            .search_chunks("systems", Some("books/missing.txt"), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ConceptRagError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_chunk_search_attaches_titles() {
        let f = fixture().await;
        let chunk_vector = HashEmbedder::new()
            .embed("replication keeps copies in sync")
            .await
            .unwrap();
        f.db.upsert_chunk(&Chunk {
            id: 100,
            catalog_id: 1,
            text: "replication keeps copies in sync".to_string(),
            vector: chunk_vector,
            concept_ids: vec![],
            concept_density: None,
            page_number: Some(42),
            token_count: 5,
            byte_offset: 0,
        })
        .unwrap();

        let hits = f
            .searcher()
            .search_chunks("replication", None, 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.catalog_title, "Distributed Systems");
        assert_eq!(hits[0].item.source, "books/distributed-systems.txt");
    }

    #[test]
    fn test_degraded_rank_renormalizes_weights() {
        let expansion = {
            let mut e = QueryExpansion::default();
            e.all_terms.push("replication".to_string());
            e.weights.insert("replication".to_string(), 1.0);
            e.original.push(crate::search::WeightedTerm {
                term: "replication".to_string(),
                weight: 1.0,
                origin: crate::search::TermOrigin::Original,
            });
            e
        };
        let weights = HybridWeightsConfig::default().chunks;
        let bm25 = Bm25Scorer::new(Bm25Config::default());

        let chunk = Chunk {
            id: 1,
            catalog_id: 1,
            text: "replication replication replication".to_string(),
            vector: vec![],
            concept_ids: vec![],
            concept_density: None,
            page_number: None,
            token_count: 3,
            byte_offset: 0,
        };
        let hit = ChunkHit {
            chunk,
            catalog_title: "Replication Handbook".to_string(),
            source: "s".to_string(),
        };

        let ranked = rank(vec![(hit, None)], &expansion, weights, &bm25, false, 10);
        assert_eq!(ranked.len(), 1);
        // Vector dropped; remaining components renormalized upward
        assert_eq!(ranked[0].components.vector, 0.0);
        assert!(ranked[0].score > 0.7);
        assert!(ranked[0].score <= 1.0 + 1e-9);
    }
}
