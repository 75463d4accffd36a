//! In-memory caches
//!
//! The conceptual ID cache is built once at startup and immutable; the
//! result and embedding caches are bounded LRUs with TTL.

mod ids;
mod lru;

pub use ids::{ConceptIdCache, IdCache};
pub use lru::{embedding_cache_key, ResultCacheKey, TtlLru};
