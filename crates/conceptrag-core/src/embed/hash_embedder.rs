//! Deterministic local embedder
//!
//! Feature-hashing over word unigrams and bigrams: each token is hashed
//! with three salts into the 384-dimension space with a sign bit, then
//! the vector is scaled to unit L2 norm. The same text always produces
//! the same vector, across processes and builds, which keeps seeded
//! vectors and query vectors comparable with no model download.

use super::Embedder;
use crate::config::EMBEDDING_DIM;
use crate::db::vectors::l2_normalize;
use crate::error::Result;
use crate::ids::hash_to_id;
use async_trait::async_trait;

const SALTS: [&str; 3] = ["u0:", "u1:", "u2:"];
const BIGRAM_SALT: &str = "b0:";

/// Local feature-hashing embedder
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            dimensions: EMBEDDING_DIM,
        }
    }

    /// Reduced-dimension variant for tests
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let h = hash_to_id(feature);
        let index = (h as usize) % self.dimensions;
        let sign = if h & 0x8000_0000 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let tokens: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        let mut vector = vec![0.0f32; self.dimensions];
        if tokens.is_empty() {
            return vector;
        }

        for token in &tokens {
            for salt in SALTS {
                self.add_feature(&mut vector, &format!("{}{}", salt, token), 1.0);
            }
        }
        for pair in tokens.windows(2) {
            self.add_feature(
                &mut vector,
                &format!("{}{} {}", BIGRAM_SALT, pair[0], pair[1]),
                0.5,
            );
        }

        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "feature-hash-v1"
    }
}
