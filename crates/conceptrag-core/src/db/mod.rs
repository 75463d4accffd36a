//! Store layer
//!
//! Four conceptual tables (catalog, chunks, concepts, categories) plus
//! the auxiliary visuals table, persisted in SQLite with inline f32-BLOB
//! embeddings. Each table exposes scan / filtered scan / vector access;
//! filters are built with the typed [`Predicate`] builder, never by
//! concatenating user strings.

mod catalog;
mod categories;
mod chunks;
mod concepts;
mod predicate;
mod rows;
mod schema;
mod visuals;
pub mod vectors;

pub use predicate::{Literal, Predicate};
pub use rows::{
    encode_id_array, encode_string_array, parse_array_field, parse_id_array, parse_string_array,
    CatalogEntry, Category, Chunk, Concept, DocType, Visual, VisualType,
};
pub use schema::Database;

use std::path::PathBuf;

impl Database {
    /// Get the default store path
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::DB_DIR_NAME)
            .join("conceptrag.sqlite")
    }
}
