//! Vector storage helpers
//!
//! Embeddings are stored as little-endian f32 BLOBs and compared with
//! cosine distance in Rust.

use crate::error::{ConceptRagError, Result};

/// Convert f32 embedding to bytes (little-endian)
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Cosine distance in [0, 2]; 0 means identical direction
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Scale a vector to unit L2 norm; the zero vector stays zero
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Whether every component is zero (the "unembedded" degraded marker)
pub fn is_zero_vector(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

/// Validate dimension at ingest time; a mismatch corrupts the table
pub fn check_ingest_dim(v: &[f32], expected: usize) -> Result<()> {
    if v.len() != expected {
        return Err(ConceptRagError::Fatal(format!(
            "embedding dimension {} does not match store dimension {}",
            v.len(),
            expected
        )));
    }
    Ok(())
}

/// Validate dimension at query time; a mismatch is a rejected input
pub fn check_query_dim(v: &[f32], expected: usize) -> Result<()> {
    if v.len() != expected {
        return Err(ConceptRagError::Validation(format!(
            "query vector dimension {} does not match store dimension {}",
            v.len(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_roundtrip() {
        let original = vec![1.0f32, 2.0, 3.0, -1.5];
        let bytes = embedding_to_bytes(&original);
        let restored = bytes_to_embedding(&bytes);
        assert_eq!(original, restored);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.0001);
    }

    #[test]
    fn test_zero_vector_has_zero_similarity() {
        let zero = vec![0.0; 3];
        let a = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&zero, &a), 0.0);
        assert!(is_zero_vector(&zero));
        assert!(!is_zero_vector(&a));
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.0001);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert!(is_zero_vector(&zero));
    }

    #[test]
    fn test_dim_checks() {
        let v = vec![0.0; 3];
        assert!(check_ingest_dim(&v, 3).is_ok());
        assert!(matches!(
            check_ingest_dim(&v, 384),
            Err(crate::error::ConceptRagError::Fatal(_))
        ));
        assert!(matches!(
            check_query_dim(&v, 384),
            Err(crate::error::ConceptRagError::Validation(_))
        ));
    }
}
