//! HNSW approximate nearest neighbor indexes
//!
//! One index per searchable table, built during seeding and at container
//! start. Small tables skip the build and fall back to a brute-force
//! cosine scan, so queries behave identically either way; only the cost
//! changes.

use crate::db::vectors::cosine_distance;
use crate::db::Database;
use crate::error::Result;
use instant_distance::{Builder, HnswMap, Search};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Minimum row count to justify building an HNSW graph
const ANN_THRESHOLD: usize = 256;

/// The searchable vector collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorCollection {
    Catalog,
    Chunks,
    Concepts,
}

impl VectorCollection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Chunks => "chunks",
            Self::Concepts => "concepts",
        }
    }
}

/// Wrapper for f32 vectors implementing instant_distance::Point
#[derive(Clone)]
struct EmbeddingPoint {
    values: Vec<f32>,
}

impl instant_distance::Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        cosine_distance(&self.values, &other.values)
    }
}

/// HNSW-backed index over one table's row vectors
pub struct AnnIndex {
    index: RwLock<Option<HnswMap<EmbeddingPoint, u32>>>,
    row_count: AtomicUsize,
}

impl AnnIndex {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(None),
            row_count: AtomicUsize::new(0),
        }
    }

    /// Build from (row id, vector) pairs; skips the graph below the
    /// threshold
    pub fn build(rows: Vec<(u32, Vec<f32>)>) -> Self {
        let count = rows.len();
        let ann = Self::new();
        ann.row_count.store(count, Ordering::Relaxed);

        if count < ANN_THRESHOLD {
            tracing::debug!(rows = count, threshold = ANN_THRESHOLD, "skipping HNSW build");
            return ann;
        }

        let (points, ids): (Vec<EmbeddingPoint>, Vec<u32>) = rows
            .into_iter()
            .map(|(id, values)| (EmbeddingPoint { values }, id))
            .unzip();

        let map = Builder::default().build(points, ids);
        if let Ok(mut guard) = ann.index.write() {
            *guard = Some(map);
        }
        tracing::debug!(rows = count, "built HNSW index");
        ann
    }

    /// k nearest (row id, cosine distance), ascending distance. Empty
    /// when the graph was not built.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(u32, f32)> {
        let guard = match self.index.read() {
            Ok(g) => g,
            Err(_) => return vec![],
        };
        let map = match guard.as_ref() {
            Some(m) => m,
            None => return vec![],
        };

        let point = EmbeddingPoint {
            values: query.to_vec(),
        };
        let mut search = Search::default();
        map.search(&point, &mut search)
            .take(k)
            .map(|item| (*item.value, item.distance))
            .collect()
    }

    pub fn is_built(&self) -> bool {
        self.index.read().map(|g| g.is_some()).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.row_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AnnIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-table indexes plus the brute-force fallback path
pub struct VectorIndexes {
    catalog: AnnIndex,
    chunks: AnnIndex,
    concepts: AnnIndex,
}

impl VectorIndexes {
    /// Empty indexes; every search falls back to brute force
    pub fn empty() -> Self {
        Self {
            catalog: AnnIndex::new(),
            chunks: AnnIndex::new(),
            concepts: AnnIndex::new(),
        }
    }

    /// Build all indexes from the store
    pub fn build(db: &Database) -> Result<Self> {
        Ok(Self {
            catalog: AnnIndex::build(db.catalog_vectors()?),
            chunks: AnnIndex::build(db.chunk_vectors()?),
            concepts: AnnIndex::build(db.concept_vectors()?),
        })
    }

    fn index(&self, collection: VectorCollection) -> &AnnIndex {
        match collection {
            VectorCollection::Catalog => &self.catalog,
            VectorCollection::Chunks => &self.chunks,
            VectorCollection::Concepts => &self.concepts,
        }
    }

    /// k nearest (row id, cosine distance), ascending. Uses HNSW when
    /// built, otherwise scans the table's vectors.
    pub fn search(
        &self,
        db: &Database,
        collection: VectorCollection,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(u32, f32)>> {
        let index = self.index(collection);
        if index.is_built() {
            return Ok(index.search(query, k));
        }

        let rows = match collection {
            VectorCollection::Catalog => db.catalog_vectors()?,
            VectorCollection::Chunks => db.chunk_vectors()?,
            VectorCollection::Concepts => db.concept_vectors()?,
        };

        let mut scored: Vec<(u32, f32)> = rows
            .into_iter()
            .map(|(id, v)| (id, cosine_distance(query, &v)))
            .collect();
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(x: f32, y: f32) -> Vec<f32> {
        let norm = (x * x + y * y).sqrt();
        vec![x / norm, y / norm]
    }

    #[test]
    fn test_below_threshold_not_built() {
        let ann = AnnIndex::build(vec![(1, unit(1.0, 0.0)), (2, unit(0.0, 1.0))]);
        assert!(!ann.is_built());
        assert_eq!(ann.len(), 2);
        assert!(ann.search(&unit(1.0, 0.0), 5).is_empty());
    }

    #[test]
    fn test_build_and_search_above_threshold() {
        let rows: Vec<(u32, Vec<f32>)> = (0..ANN_THRESHOLD as u32 + 16)
            .map(|i| {
                let angle = i as f32 * 0.01;
                (i, unit(angle.cos(), angle.sin()))
            })
            .collect();
        let ann = AnnIndex::build(rows);
        assert!(ann.is_built());

        let results = ann.search(&unit(1.0, 0.0), 5);
        assert_eq!(results.len(), 5);
        // Nearest neighbor of angle 0 is row 0
        assert_eq!(results[0].0, 0);
        for window in results.windows(2) {
            assert!(window[0].1 <= window[1].1);
        }
    }

    #[test]
    fn test_brute_force_fallback() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.conn
            .execute_batch(
                "INSERT INTO chunks (id, catalog_id, text, vector) VALUES
                 (1, 1, 'a', X'0000803F00000000'),
                 (2, 1, 'b', X'000000000000803F');",
            )
            .unwrap();

        let indexes = VectorIndexes::empty();
        let results = indexes
            .search(&db, VectorCollection::Chunks, &[1.0, 0.0], 2)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 1);
        assert!(results[0].1 < results[1].1);
    }
}
