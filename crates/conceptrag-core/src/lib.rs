//! Conceptrag core library
//!
//! Conceptual hybrid retrieval over a personal library of technical
//! documents.
//!
//! # Features
//! - Four-table conceptual data model with hash-derived stable IDs
//! - Hybrid ranking: vector + BM25 + title + lexical expansion
//! - Verified concept lookup and hierarchical concept retrieval
//! - Circuit breaker / bulkhead / timeout / retry resilience kernel
//! - Resumable, checkpointed seeding pipeline

pub mod cache;
pub mod config;
pub mod container;
pub mod db;
pub mod embed;
pub mod error;
pub mod ids;
pub mod resilience;
pub mod search;
pub mod seed;
pub mod tools;

pub use cache::{ConceptIdCache, IdCache, ResultCacheKey, TtlLru};
pub use config::{
    Bm25Config, Config, HybridWeights, HybridWeightsConfig, ResilienceTuning, EMBEDDING_DIM,
};
pub use container::Container;
pub use db::{
    CatalogEntry, Category, Chunk, Concept, Database, DocType, Predicate, Visual, VisualType,
};
pub use embed::{CachedEmbedder, Embedder, HashEmbedder, HttpEmbedder, ResilientEmbedder};
pub use error::{ConceptRagError, Error, Result};
pub use ids::{generate_stable_id, hash_to_id, normalize_name};
pub use resilience::{
    profiles, BulkheadConfig, CircuitBreakerConfig, CircuitState, HealthSummary, ResilienceConfig,
    ResilienceKernel, ResilienceProfiles, RetryConfig,
};
pub use search::{HybridSearcher, Lexicon, QueryExpansion, VectorIndexes};
pub use seed::{SeedOptions, SeedReport, SeedStage, Seeder};

/// Default store directory name
pub const DB_DIR_NAME: &str = "conceptrag";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "conceptrag";
