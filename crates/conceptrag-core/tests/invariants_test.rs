//! Property tests for the identity scheme, ranking math, and caches.

use conceptrag_core::search::{Bm25Scorer, QueryExpansion, TokenizedDoc};
use conceptrag_core::{generate_stable_id, hash_to_id, Bm25Config, HybridWeightsConfig, TtlLru};
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;

proptest! {
    #[test]
    fn hash_is_pure(s in ".{0,64}") {
        prop_assert_eq!(hash_to_id(&s), hash_to_id(&s));
    }

    #[test]
    fn stable_id_avoids_existing(s in "[a-z ]{1,24}", taken in proptest::collection::hash_set(any::<u32>(), 0..64)) {
        let id = generate_stable_id(&s, &taken);
        prop_assert!(!taken.contains(&id));
    }

    #[test]
    fn stable_id_is_deterministic(s in "[a-z ]{1,24}") {
        let mut existing = HashSet::new();
        existing.insert(hash_to_id(&s));
        let a = generate_stable_id(&s, &existing);
        let b = generate_stable_id(&s, &existing);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn bm25_is_bounded_and_finite(text in ".{0,200}", term in "[a-z]{1,12}") {
        let scorer = Bm25Scorer::new(Bm25Config::default());
        let doc = TokenizedDoc::new(&text);
        let mut expansion = QueryExpansion::default();
        expansion.all_terms.push(term.clone());
        expansion.weights.insert(term, 1.0);

        let score = scorer.score(&doc, &expansion);
        prop_assert!(score.score.is_finite());
        prop_assert!((0.0..=1.0).contains(&score.score));
        prop_assert!((0.0..=1.0).contains(&score.coverage));
    }

    #[test]
    fn lru_never_exceeds_capacity(keys in proptest::collection::vec(any::<u16>(), 0..200)) {
        let cache: TtlLru<u16, u16> = TtlLru::new(16, Duration::from_secs(60));
        for key in keys {
            cache.insert(key, key);
            prop_assert!(cache.len() <= 16);
        }
    }
}

#[test]
fn hybrid_weights_sum_to_one_per_collection() {
    let weights = HybridWeightsConfig::default();
    for (name, w) in [
        ("catalog", weights.catalog),
        ("chunks", weights.chunks),
        ("concepts", weights.concepts),
    ] {
        assert!(
            (w.sum() - 1.0).abs() < 1e-9,
            "{} weights sum to {}",
            name,
            w.sum()
        );
    }
}
