//! Conceptual ID cache
//!
//! Bidirectional name<->id maps for concepts and categories, built once
//! at container startup from a full table scan and immutable afterwards.
//! Because IDs are hash-derived, the cache is a precomputed acceleration
//! of `hash_to_id` plus an index of names that actually exist.

use crate::db::Database;
use crate::error::Result;
use crate::ids::normalize_name;
use std::collections::HashMap;

/// Scan limit well above the expected table maximum
const INIT_SCAN_LIMIT: usize = 100_000;

/// Immutable name<->id maps for one domain (concepts or categories)
#[derive(Debug, Default)]
pub struct IdCache {
    id_to_name: HashMap<u32, String>,
    name_to_id: HashMap<String, u32>,
}

impl IdCache {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, String)>) -> Self {
        let mut id_to_name = HashMap::new();
        let mut name_to_id = HashMap::new();
        for (id, name) in pairs {
            let normalized = normalize_name(&name);
            id_to_name.insert(id, normalized.clone());
            name_to_id.insert(normalized, id);
        }
        Self {
            id_to_name,
            name_to_id,
        }
    }

    /// Resolve a name; `None` means the name does not exist
    pub fn get_id(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(&normalize_name(name)).copied()
    }

    /// Resolve an id to its name
    pub fn get_name(&self, id: u32) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    /// Resolve names in bulk, dropping the missing ones
    pub fn get_ids(&self, names: &[String]) -> Vec<u32> {
        names.iter().filter_map(|n| self.get_id(n)).collect()
    }

    /// Resolve ids in bulk. Missing ids are dropped silently: they are
    /// stale references left behind by a concept rename and are
    /// non-fatal.
    pub fn get_names(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.get_name(*id).map(String::from))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }
}

/// Process-wide ID caches for both domains
#[derive(Debug, Default)]
pub struct ConceptIdCache {
    pub concepts: IdCache,
    pub categories: IdCache,
}

impl ConceptIdCache {
    /// Build from the store. Missing tables yield empty maps so the
    /// container can start against a partially seeded installation.
    pub fn build(db: &Database) -> Result<Self> {
        let concepts = if db.table_exists("concepts") {
            IdCache::from_pairs(
                db.scan_concepts(INIT_SCAN_LIMIT)?
                    .into_iter()
                    .map(|c| (c.id, c.concept)),
            )
        } else {
            tracing::warn!("concepts table missing; concept lookups degrade to empty");
            IdCache::default()
        };

        let categories = if db.table_exists("categories") {
            IdCache::from_pairs(
                db.scan_categories(INIT_SCAN_LIMIT)?
                    .into_iter()
                    .map(|c| (c.id, c.category)),
            )
        } else {
            tracing::warn!("categories table missing; category lookups degrade to empty");
            IdCache::default()
        };

        tracing::debug!(
            concepts = concepts.len(),
            categories = categories.len(),
            "id cache initialized"
        );

        Ok(Self {
            concepts,
            categories,
        })
    }
}
