//! Stable identifier derivation
//!
//! Every entity ID in the store is a 32-bit FNV-1a hash of a canonical
//! string: catalog IDs hash the source path, chunk IDs hash
//! `source + offset`, concept and category IDs hash the normalized name.
//! Rebuilding the database therefore reassigns nothing.

use std::collections::HashSet;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// FNV-1a 32-bit hash over the UTF-8 bytes of `s`
pub fn hash_to_id(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Derive an ID for `s` that does not collide with `existing`.
///
/// On collision the canonical string is suffixed with `::k` for the first
/// k >= 0 whose hash is free. The caller must persist the resolved
/// `(s, id)` pair so collisions discovered at ingest are reproduced at
/// query time.
pub fn generate_stable_id(s: &str, existing: &HashSet<u32>) -> u32 {
    let direct = hash_to_id(s);
    if !existing.contains(&direct) {
        return direct;
    }
    let mut k: u64 = 0;
    loop {
        let candidate = hash_to_id(&format!("{}::{}", s, k));
        if !existing.contains(&candidate) {
            return candidate;
        }
        k += 1;
    }
}

/// Normalize a concept or category name before hashing
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
