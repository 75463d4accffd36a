//! BM25-style term scoring
//!
//! Weighted term coverage over FNV-tokenized text. Each query term
//! contributes a saturated term-frequency score scaled by its match
//! quality (exact word, prefix, substring) and its expansion weight.
//! The final score blends the normalized raw sum with plain term
//! coverage, both in [0, 1].

use super::expander::QueryExpansion;
use super::tokenize;
use crate::config::Bm25Config;
use crate::ids::hash_to_id;
use std::collections::HashMap;

/// Match-quality multipliers
const EXACT_WEIGHT: f64 = 1.0;
const PREFIX_WEIGHT: f64 = 0.5;
const SUBSTRING_WEIGHT: f64 = 0.25;

/// A document prepared for repeated term scoring
#[derive(Debug, Clone)]
pub struct TokenizedDoc {
    tokens: Vec<String>,
    counts: HashMap<u32, usize>,
    length: usize,
}

impl TokenizedDoc {
    pub fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let mut counts = HashMap::new();
        for token in &tokens {
            *counts.entry(hash_to_id(token)).or_insert(0) += 1;
        }
        let length = tokens.len();
        Self {
            tokens,
            counts,
            length,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Best match quality and matched token frequency for one term
    fn match_term(&self, term: &str) -> Option<(f64, usize)> {
        let exact = self.counts.get(&hash_to_id(term)).copied().unwrap_or(0);
        if exact > 0 {
            return Some((EXACT_WEIGHT, exact));
        }

        let mut prefix = 0;
        let mut substring = 0;
        for token in &self.tokens {
            if token.starts_with(term) {
                prefix += 1;
            } else if token.contains(term) {
                substring += 1;
            }
        }
        if prefix > 0 {
            Some((PREFIX_WEIGHT, prefix))
        } else if substring > 0 {
            Some((SUBSTRING_WEIGHT, substring))
        } else {
            None
        }
    }

    /// Whether a (possibly multi-word) term appears with word
    /// boundaries
    pub fn contains_phrase(&self, term: &str) -> bool {
        let words = tokenize(term);
        match words.len() {
            0 => false,
            1 => self.counts.contains_key(&hash_to_id(&words[0])),
            n => self
                .tokens
                .windows(n)
                .any(|window| window.iter().zip(&words).all(|(a, b)| a == b)),
        }
    }
}

/// Component score with its parts, for debug output
#[derive(Debug, Clone, Copy, Default)]
pub struct Bm25Score {
    pub score: f64,
    pub normalized_raw: f64,
    pub coverage: f64,
    pub matched_terms: usize,
    pub total_terms: usize,
}

/// BM25 scorer with fixed parameters
#[derive(Debug, Clone, Copy)]
pub struct Bm25Scorer {
    config: Bm25Config,
}

impl Bm25Scorer {
    pub fn new(config: Bm25Config) -> Self {
        Self { config }
    }

    /// Saturated, length-normalized term frequency in [0, 1)
    fn saturate(&self, tf: usize, doc_length: usize) -> f64 {
        if tf == 0 {
            return 0.0;
        }
        let tf = tf as f64;
        let k1 = self.config.k1;
        let b = self.config.b;
        let len_norm = 1.0 - b + b * (doc_length as f64 / self.config.avg_doc_length);
        (tf * (k1 + 1.0)) / (tf + k1 * len_norm) / (k1 + 1.0)
    }

    /// Score all expanded terms against one document
    pub fn score(&self, doc: &TokenizedDoc, expansion: &QueryExpansion) -> Bm25Score {
        let total_terms = expansion.all_terms.len();
        if total_terms == 0 || doc.is_empty() {
            return Bm25Score {
                total_terms,
                ..Bm25Score::default()
            };
        }

        let mut raw = 0.0;
        let mut weight_budget = 0.0;
        let mut matched_terms = 0;

        for term in &expansion.all_terms {
            let term_weight = expansion.weights.get(term).copied().unwrap_or(0.0);
            weight_budget += term_weight;

            // Multi-word terms (corpus concept names) match as phrases
            let hit = if term.contains(' ') {
                if doc.contains_phrase(term) {
                    Some((EXACT_WEIGHT, 1))
                } else {
                    None
                }
            } else {
                doc.match_term(term)
            };

            if let Some((match_weight, tf)) = hit {
                matched_terms += 1;
                raw += self.saturate(tf, doc.len()) * match_weight * term_weight;
            }
        }

        let normalized_raw = if weight_budget > 0.0 {
            (raw / weight_budget).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let coverage = matched_terms as f64 / total_terms as f64;
        let score = (0.5 * normalized_raw + 0.5 * coverage).clamp(0.0, 1.0);

        Bm25Score {
            score,
            normalized_raw,
            coverage,
            matched_terms,
            total_terms,
        }
    }
}

/// Fraction of the given terms that appear in the document with word
/// boundaries; used for the title and WordNet components.
pub fn term_coverage(doc: &TokenizedDoc, terms: &[String]) -> f64 {
    if terms.is_empty() || doc.is_empty() {
        return 0.0;
    }
    let matched = terms.iter().filter(|t| doc.contains_phrase(t)).count();
    matched as f64 / terms.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::expander::{TermOrigin, WeightedTerm};

    fn expansion(terms: &[(&str, f64)]) -> QueryExpansion {
        let mut expansion = QueryExpansion::default();
        for (term, weight) in terms {
            expansion.all_terms.push((*term).to_string());
            expansion.weights.insert((*term).to_string(), *weight);
            expansion.original.push(WeightedTerm {
                term: (*term).to_string(),
                weight: *weight,
                origin: TermOrigin::Original,
            });
        }
        expansion
    }

    #[test]
    fn test_full_coverage_exact_match() {
        let scorer = Bm25Scorer::new(Bm25Config::default());
        let doc = TokenizedDoc::new("distributed systems are everywhere");
        let exp = expansion(&[("distributed", 1.0), ("systems", 1.0)]);

        let score = scorer.score(&doc, &exp);
        assert_eq!(score.coverage, 1.0);
        assert_eq!(score.matched_terms, 2);
        assert!(score.score > 0.5);
        assert!(score.score <= 1.0);
    }

    #[test]
    fn test_no_match_is_zero() {
        let scorer = Bm25Scorer::new(Bm25Config::default());
        let doc = TokenizedDoc::new("sourdough starter maintenance");
        let exp = expansion(&[("kubernetes", 1.0)]);

        let score = scorer.score(&doc, &exp);
        assert_eq!(score.score, 0.0);
        assert_eq!(score.coverage, 0.0);
    }

    #[test]
    fn test_empty_query_and_empty_doc() {
        let scorer = Bm25Scorer::new(Bm25Config::default());
        let doc = TokenizedDoc::new("some text");
        let score = scorer.score(&doc, &QueryExpansion::default());
        assert_eq!(score.score, 0.0);
        assert!(!score.score.is_nan());

        let empty_doc = TokenizedDoc::new("");
        let exp = expansion(&[("term", 1.0)]);
        let score = scorer.score(&empty_doc, &exp);
        assert_eq!(score.score, 0.0);
        assert!(!score.score.is_nan());
    }

    #[test]
    fn test_prefix_scores_below_exact() {
        let scorer = Bm25Scorer::new(Bm25Config::default());
        let exact_doc = TokenizedDoc::new("shard shard shard");
        let prefix_doc = TokenizedDoc::new("sharding sharding sharding");
        let exp = expansion(&[("shard", 1.0)]);

        let exact = scorer.score(&exact_doc, &exp);
        let prefix = scorer.score(&prefix_doc, &exp);
        assert!(exact.normalized_raw > prefix.normalized_raw);
        // Coverage counts both as matched
        assert_eq!(exact.coverage, prefix.coverage);
    }

    #[test]
    fn test_expansion_weight_scales_contribution() {
        let scorer = Bm25Scorer::new(Bm25Config::default());
        let doc = TokenizedDoc::new("proxy routing layer");
        let strong = scorer.score(&doc, &expansion(&[("proxy", 1.0)]));
        let weak = scorer.score(&doc, &expansion(&[("proxy", 0.4)]));
        // Normalization divides by the weight budget, so raw equalizes;
        // the saturated component must stay bounded either way
        assert!(strong.score <= 1.0 && weak.score <= 1.0);
        assert!(strong.score > 0.0 && weak.score > 0.0);
    }

    #[test]
    fn test_phrase_matching() {
        let doc = TokenizedDoc::new("the api gateway routes traffic");
        assert!(doc.contains_phrase("api gateway"));
        assert!(!doc.contains_phrase("gateway api"));
        assert!(doc.contains_phrase("routes"));
        assert!(!doc.contains_phrase(""));
    }

    #[test]
    fn test_term_coverage() {
        let doc = TokenizedDoc::new("circuit breaker state machine");
        let terms = vec!["circuit".to_string(), "breaker".to_string(), "pool".to_string()];
        let coverage = term_coverage(&doc, &terms);
        assert!((coverage - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(term_coverage(&doc, &[]), 0.0);
    }
}
