//! Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Embedding dimension used throughout the store
pub const EMBEDDING_DIM: usize = 384;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Installation directory: holds the store, checkpoint and stage cache
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory of source documents to seed from
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,

    /// Embedding dimension (fixed; a mismatch at ingest is fatal)
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Hybrid component weights per collection
    #[serde(default)]
    pub hybrid_weights: HybridWeightsConfig,

    /// BM25 parameters
    #[serde(default)]
    pub bm25: Bm25Config,

    /// Search-result cache TTL in seconds
    #[serde(default = "default_result_cache_ttl")]
    pub result_cache_ttl_secs: u64,

    /// Embedding cache TTL in seconds
    #[serde(default = "default_embedding_cache_ttl")]
    pub embedding_cache_ttl_secs: u64,

    /// Optional remote embedding service; when unset the deterministic
    /// local embedder is used
    #[serde(default)]
    pub embedding_service: Option<EmbeddingServiceConfig>,

    /// Resilience profile tuning
    #[serde(default)]
    pub resilience: ResilienceTuning,
}

/// Tunable knobs over the built-in resilience profiles
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResilienceTuning {
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,
    #[serde(default = "default_llm_retries")]
    pub llm_max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub embedding_timeout_secs: u64,
    #[serde(default = "default_database_timeout")]
    pub database_timeout_secs: u64,
    #[serde(default = "default_database_retries")]
    pub database_max_retries: u32,
}

impl Default for ResilienceTuning {
    fn default() -> Self {
        Self {
            llm_timeout_secs: default_llm_timeout(),
            llm_max_retries: default_llm_retries(),
            embedding_timeout_secs: default_embedding_timeout(),
            database_timeout_secs: default_database_timeout(),
            database_max_retries: default_database_retries(),
        }
    }
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_llm_retries() -> u32 {
    3
}

fn default_embedding_timeout() -> u64 {
    10
}

fn default_database_timeout() -> u64 {
    5
}

fn default_database_retries() -> u32 {
    5
}

/// Per-collection hybrid weights (vector, bm25, title, wordnet)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HybridWeights {
    pub vector: f64,
    pub bm25: f64,
    pub title: f64,
    pub wordnet: f64,
}

impl HybridWeights {
    pub fn sum(&self) -> f64 {
        self.vector + self.bm25 + self.title + self.wordnet
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridWeightsConfig {
    #[serde(default = "default_catalog_weights")]
    pub catalog: HybridWeights,
    #[serde(default = "default_chunk_weights")]
    pub chunks: HybridWeights,
    #[serde(default = "default_concept_weights")]
    pub concepts: HybridWeights,
}

impl Default for HybridWeightsConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_weights(),
            chunks: default_chunk_weights(),
            concepts: default_concept_weights(),
        }
    }
}

fn default_catalog_weights() -> HybridWeights {
    HybridWeights { vector: 0.30, bm25: 0.30, title: 0.25, wordnet: 0.15 }
}

fn default_chunk_weights() -> HybridWeights {
    HybridWeights { vector: 0.35, bm25: 0.30, title: 0.20, wordnet: 0.15 }
}

fn default_concept_weights() -> HybridWeights {
    HybridWeights { vector: 0.30, bm25: 0.20, title: 0.40, wordnet: 0.10 }
}

/// BM25 scoring parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Config {
    #[serde(default = "default_k1")]
    pub k1: f64,
    #[serde(default = "default_b")]
    pub b: f64,
    #[serde(default = "default_avg_doc_length")]
    pub avg_doc_length: f64,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            avg_doc_length: default_avg_doc_length(),
        }
    }
}

fn default_k1() -> f64 {
    1.5
}

fn default_b() -> f64 {
    0.75
}

fn default_avg_doc_length() -> f64 {
    100.0
}

/// External embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    /// Base URL of the embeddings endpoint
    pub url: String,

    /// Model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    std::env::var("CONCEPTRAG_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_timeout() -> u64 {
    10
}

fn default_db_path() -> PathBuf {
    std::env::var("CONCEPTRAG_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(crate::DB_DIR_NAME)
        })
}

fn default_files_dir() -> PathBuf {
    std::env::var("CONCEPTRAG_FILES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./documents"))
}

fn default_embedding_dim() -> usize {
    EMBEDDING_DIM
}

fn default_result_cache_ttl() -> u64 {
    300
}

fn default_embedding_cache_ttl() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            files_dir: default_files_dir(),
            embedding_dim: default_embedding_dim(),
            hybrid_weights: HybridWeightsConfig::default(),
            bm25: Bm25Config::default(),
            result_cache_ttl_secs: default_result_cache_ttl(),
            embedding_cache_ttl_secs: default_embedding_cache_ttl(),
            embedding_service: None,
            resilience: ResilienceTuning::default(),
        }
    }
}

impl Config {
    /// Load config from default path, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Path of the SQLite store inside the installation directory
    pub fn store_path(&self) -> PathBuf {
        self.db_path.join("conceptrag.sqlite")
    }

    /// Path of the seeding checkpoint file
    pub fn checkpoint_path(&self) -> PathBuf {
        self.db_path.join(".seeding-checkpoint.json")
    }

    /// Root of the per-document stage cache
    pub fn stage_cache_dir(&self) -> PathBuf {
        self.db_path.join(".stage-cache")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = HybridWeightsConfig::default();
        for weights in [w.catalog, w.chunks, w.concepts] {
            assert!((weights.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_default_bm25_parameters() {
        let bm25 = Bm25Config::default();
        assert_eq!(bm25.k1, 1.5);
        assert_eq!(bm25.b, 0.75);
        assert_eq!(bm25.avg_doc_length, 100.0);
    }

    #[test]
    fn test_roundtrip_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.embedding_dim, EMBEDDING_DIM);
        assert_eq!(parsed.result_cache_ttl_secs, 300);
        assert_eq!(parsed.embedding_cache_ttl_secs, 3600);
    }

    #[test]
    fn test_resilience_tuning_defaults() {
        let tuning = ResilienceTuning::default();
        assert_eq!(tuning.llm_timeout_secs, 30);
        assert_eq!(tuning.llm_max_retries, 3);
        assert_eq!(tuning.embedding_timeout_secs, 10);
        assert_eq!(tuning.database_timeout_secs, 5);
        assert_eq!(tuning.database_max_retries, 5);
    }
}
