//! Embedding service
//!
//! Maps text to 384-dimension unit vectors. The default engine is a
//! deterministic local feature-hashing embedder; an HTTP embedder can be
//! configured instead. Query-path calls go through [`CachedEmbedder`],
//! which retries once and then degrades to the zero vector so the ranker
//! can drop its vector component instead of failing the search.

mod hash_embedder;
mod http_embedder;

pub use hash_embedder::HashEmbedder;
pub use http_embedder::HttpEmbedder;

use crate::cache::{embedding_cache_key, TtlLru};
use crate::error::Result;
use crate::resilience::{ResilienceConfig, ResilienceKernel};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Model name
    fn model_name(&self) -> &str;
}

/// A query embedding, possibly degraded to zero after repeated failure
#[derive(Debug, Clone)]
pub struct EmbeddedText {
    pub vector: Vec<f32>,
    /// True when embedding failed twice and the zero vector was
    /// substituted; the ranker drops the vector component.
    pub degraded: bool,
}

/// Runs an external embedder under the resilience kernel's embedding
/// profile (bulkhead + timeout)
pub struct ResilientEmbedder {
    inner: Arc<dyn Embedder>,
    kernel: Arc<ResilienceKernel>,
    profile: ResilienceConfig,
}

impl ResilientEmbedder {
    pub fn new(
        inner: Arc<dyn Embedder>,
        kernel: Arc<ResilienceKernel>,
        profile: ResilienceConfig,
    ) -> Self {
        Self {
            inner,
            kernel,
            profile,
        }
    }
}

#[async_trait]
impl Embedder for ResilientEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.kernel
            .execute("embedding", &self.profile, || self.inner.embed(text))
            .await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.kernel
            .execute("embedding", &self.profile, || self.inner.embed_batch(texts))
            .await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Caching + degrading wrapper around any embedder
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: TtlLru<String, Vec<f32>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlLru::new(capacity, ttl),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    pub fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    /// Embed with cache; errors propagate (used at ingest, where a
    /// failure must not silently produce zero rows)
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = embedding_cache_key(text);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(len = key.len(), "embedding cache hit");
            return Ok(hit);
        }
        let vector = self.inner.embed(text).await?;
        self.cache.insert(key, vector.clone());
        Ok(vector)
    }

    /// Embed for the query path: one retry, then degrade to zero
    pub async fn embed_or_degrade(&self, text: &str) -> EmbeddedText {
        match self.embed(text).await {
            Ok(vector) => EmbeddedText {
                vector,
                degraded: false,
            },
            Err(first) => {
                tracing::debug!(error = %first, "embedding failed, retrying once");
                match self.embed(text).await {
                    Ok(vector) => EmbeddedText {
                        vector,
                        degraded: false,
                    },
                    Err(second) => {
                        tracing::warn!(error = %second, "embedding failed twice, degrading to zero vector");
                        EmbeddedText {
                            vector: vec![0.0; self.inner.dimensions()],
                            degraded: true,
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConceptRagError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyEmbedder {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(ConceptRagError::Embedding("down".into()))
            } else {
                Ok(vec![1.0, 0.0])
            }
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_retry_once_then_succeed() {
        let embedder = CachedEmbedder::new(
            Arc::new(FlakyEmbedder {
                calls: AtomicUsize::new(0),
                fail_first: 1,
            }),
            16,
            Duration::from_secs(60),
        );
        let result = embedder.embed_or_degrade("hello").await;
        assert!(!result.degraded);
        assert_eq!(result.vector, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_degrades_to_zero_after_second_failure() {
        let embedder = CachedEmbedder::new(
            Arc::new(FlakyEmbedder {
                calls: AtomicUsize::new(0),
                fail_first: 2,
            }),
            16,
            Duration::from_secs(60),
        );
        let result = embedder.embed_or_degrade("hello").await;
        assert!(result.degraded);
        assert!(result.vector.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_resilient_embedder_delegates_and_records() {
        let kernel = Arc::new(ResilienceKernel::new());
        let embedder = ResilientEmbedder::new(
            Arc::new(FlakyEmbedder {
                calls: AtomicUsize::new(0),
                fail_first: 0,
            }),
            kernel.clone(),
            crate::resilience::profiles::embedding(),
        );

        let vector = embedder.embed("hello").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0]);
        assert_eq!(embedder.dimensions(), 2);

        let metrics = kernel.get_metrics("embedding").unwrap();
        let bulkhead = metrics.bulkhead.unwrap();
        assert_eq!(bulkhead.active, 0);
        assert_eq!(bulkhead.rejections, 0);
    }

    #[tokio::test]
    async fn test_cache_serves_second_call() {
        let flaky = Arc::new(FlakyEmbedder {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        });
        let embedder =
            CachedEmbedder::new(flaky.clone(), 16, Duration::from_secs(60));
        embedder.embed("hello").await.unwrap();
        embedder.embed(" hello ").await.unwrap();
        // Keyed by trimmed text, so the second call was a cache hit
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}
