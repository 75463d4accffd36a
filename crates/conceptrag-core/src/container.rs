//! Dependency container
//!
//! Wires the components in a fixed order: resilience kernel and
//! embedder first, then the store, then the ID caches (which scan the
//! store), then the vector indexes and search services. Shutdown drops
//! in reverse by field order. A missing concept or category table
//! degrades the dependent services to empty results instead of failing
//! startup.

use crate::cache::{ConceptIdCache, ResultCacheKey, TtlLru};
use crate::config::Config;
use crate::db::Database;
use crate::embed::{CachedEmbedder, Embedder, HashEmbedder, HttpEmbedder, ResilientEmbedder};
use crate::error::Result;
use crate::resilience::{ResilienceKernel, ResilienceProfiles};
use crate::search::{HybridSearcher, Lexicon, VectorIndexes};
use crate::seed::{
    ConceptExtractor, HeuristicExtractor, SeedOptions, SeedReport, Seeder, TextLoader,
};
use std::sync::Arc;
use std::time::Duration;

/// Result cache capacity (entries)
const RESULT_CACHE_CAPACITY: usize = 1_000;
/// Embedding cache capacity (entries)
const EMBEDDING_CACHE_CAPACITY: usize = 1_000;

/// Fully wired engine handle
pub struct Container {
    pub config: Config,
    pub kernel: Arc<ResilienceKernel>,
    pub profiles: ResilienceProfiles,
    pub embedder: CachedEmbedder,
    pub db: Database,
    pub ids: ConceptIdCache,
    pub indexes: VectorIndexes,
    pub lexicon: Lexicon,
    pub result_cache: TtlLru<ResultCacheKey, serde_json::Value>,
    pub extractor: Box<dyn ConceptExtractor>,
}

impl Container {
    /// Build the container from configuration
    pub fn new(config: Config) -> Result<Self> {
        let kernel = Arc::new(ResilienceKernel::new());
        let profiles = ResilienceProfiles::from_tuning(&config.resilience);

        // Only the external service goes through the kernel; the local
        // embedder has nothing to protect
        let inner: Arc<dyn Embedder> = match &config.embedding_service {
            Some(service) => {
                tracing::info!(url = %service.url, "using HTTP embedding service");
                Arc::new(ResilientEmbedder::new(
                    Arc::new(HttpEmbedder::new(service, config.embedding_dim)?),
                    kernel.clone(),
                    profiles.embedding,
                ))
            }
            None => Arc::new(HashEmbedder::new()),
        };
        let embedder = CachedEmbedder::new(
            inner,
            EMBEDDING_CACHE_CAPACITY,
            Duration::from_secs(config.embedding_cache_ttl_secs),
        );

        let db = Database::open(config.store_path())?;
        db.initialize()?;

        // Caches require the store; searchers require both
        let ids = ConceptIdCache::build(&db)?;
        let indexes = VectorIndexes::build(&db)?;

        let result_cache = TtlLru::new(
            RESULT_CACHE_CAPACITY,
            Duration::from_secs(config.result_cache_ttl_secs),
        );

        Ok(Self {
            config,
            kernel,
            profiles,
            embedder,
            db,
            ids,
            indexes,
            lexicon: Lexicon::new(),
            result_cache,
            extractor: Box::new(HeuristicExtractor::new()),
        })
    }

    /// Hybrid searcher borrowing the wired components
    pub fn searcher(&self) -> HybridSearcher<'_> {
        HybridSearcher::new(
            &self.db,
            &self.indexes,
            &self.embedder,
            &self.ids,
            &self.lexicon,
            &self.config.hybrid_weights,
            self.config.bm25,
        )
    }

    /// Run the seeding pipeline, then rebuild the ID cache and vector
    /// indexes so queries see the new rows
    pub async fn seed(&mut self, options: SeedOptions) -> Result<SeedReport> {
        let report = {
            let loader = TextLoader;
            let seeder = Seeder::new(
                &self.db,
                &self.embedder,
                self.extractor.as_ref(),
                &loader,
                &self.config.db_path,
                &self.config.files_dir,
            );
            seeder.run(options).await?
        };

        self.ids = ConceptIdCache::build(&self.db)?;
        self.indexes = VectorIndexes::build(&self.db)?;
        self.result_cache.clear();
        Ok(report)
    }
}
