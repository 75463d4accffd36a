//! Concept extraction
//!
//! The default extractor is a deterministic heuristic: frequent
//! non-stopword phrases plus title-case technical terms. An LLM-backed
//! extractor can be plugged in behind the same trait; it runs under the
//! resilience kernel's LLM profile at the call site.

use crate::error::{ConceptRagError, Result};
use crate::ids::normalize_name;
use crate::search::tokenize;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Common English stop words excluded from concept candidates
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "in",
    "is", "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "does", "do",
    "did", "can", "could", "should", "would", "what", "where", "when", "why", "how", "who",
    "which", "this", "these", "those", "there", "here", "not", "but", "or", "we", "you", "they",
    "their", "our", "your", "all", "each", "more", "most", "other", "some", "such", "than",
    "then", "also", "into", "about", "over", "between",
];

/// Most concepts kept per document
const MAX_CONCEPTS: usize = 24;
/// Minimum occurrences for a frequency-derived concept
const MIN_FREQUENCY: usize = 2;

/// Extraction output; mirrors the `extract_concepts` tool payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedConcepts {
    pub primary_concepts: Vec<String>,
    pub technical_terms: Vec<String>,
    pub categories: Vec<String>,
}

/// Concept extraction seam; ingestion and the `extract_concepts` tool
/// both go through it
#[async_trait]
pub trait ConceptExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<ExtractedConcepts>;
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Deterministic frequency + casing heuristic extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Title-case runs of 2+ words ("Circuit Breaker", "API Gateway")
    fn title_case_phrases(text: &str) -> Vec<String> {
        let mut phrases = Vec::new();
        for line in text.lines() {
            let words: Vec<&str> = line.split_whitespace().collect();
            let mut run: Vec<&str> = Vec::new();
            for &word in words.iter().chain(std::iter::once(&"")) {
                let stripped: String = word
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect();
                let title_cased = stripped
                    .chars()
                    .next()
                    .map(|c| c.is_uppercase())
                    .unwrap_or(false)
                    && stripped.len() > 1;
                if title_cased && !is_stop_word(&stripped.to_lowercase()) {
                    run.push(word);
                } else {
                    if run.len() >= 2 {
                        let phrase = normalize_name(
                            &run.iter()
                                .map(|w| {
                                    w.chars()
                                        .filter(|c| c.is_alphanumeric() || *c == '-')
                                        .collect::<String>()
                                })
                                .collect::<Vec<_>>()
                                .join(" "),
                        );
                        if !phrases.contains(&phrase) {
                            phrases.push(phrase);
                        }
                    }
                    run.clear();
                }
            }
        }
        phrases
    }

    /// Frequent unigrams and bigrams after stopword removal
    fn frequent_terms(text: &str) -> Vec<String> {
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|t| !is_stop_word(t) && t.len() > 2 && !t.chars().all(|c| c.is_numeric()))
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for token in &tokens {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }
        for pair in tokens.windows(2) {
            *counts.entry(format!("{} {}", pair[0], pair[1])).or_insert(0) += 1;
        }

        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|(_, count)| *count >= MIN_FREQUENCY)
            .collect();
        // Bigrams ahead of unigrams at equal frequency, then by count,
        // then alphabetically for determinism
        ranked.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| b.0.contains(' ').cmp(&a.0.contains(' ')))
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.into_iter().map(|(term, _)| term).collect()
    }
}

#[async_trait]
impl ConceptExtractor for HeuristicExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractedConcepts> {
        if text.trim().is_empty() {
            return Ok(ExtractedConcepts::default());
        }

        let technical_terms = Self::title_case_phrases(text);
        let mut primary_concepts = technical_terms.clone();
        for term in Self::frequent_terms(text) {
            if primary_concepts.len() >= MAX_CONCEPTS {
                break;
            }
            if !primary_concepts.contains(&term) {
                primary_concepts.push(term);
            }
        }

        let categories = super::taxonomy::derive_categories(&primary_concepts)
            .into_iter()
            .map(|c| c.name.to_string())
            .collect();

        Ok(ExtractedConcepts {
            primary_concepts,
            technical_terms,
            categories,
        })
    }
}

/// LLM-backed extractor speaking an OpenAI-style chat endpoint
pub struct HttpConceptExtractor {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpConceptExtractor {
    pub fn new(url: &str, model: &str, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            url: format!("{}/v1/chat/completions", url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl ConceptExtractor for HttpConceptExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractedConcepts> {
        let prompt = format!(
            "Extract the key concepts from the following document excerpt. \
             Respond with JSON: {{\"primary_concepts\": [...], \
             \"technical_terms\": [...], \"categories\": [...]}}.\n\n{}",
            &text[..text.len().min(8000)]
        );

        let mut request = self.client.post(&self.url).json(&serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        }));
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ConceptRagError::transient(
                "extract.llm",
                format!("service returned {}", response.status()),
            ));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        // The model may wrap JSON in a code fence
        let json = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let mut extracted: ExtractedConcepts = serde_json::from_str(json)
            .map_err(|e| ConceptRagError::transient("extract.llm", format!("bad payload: {}", e)))?;
        for list in [
            &mut extracted.primary_concepts,
            &mut extracted.technical_terms,
            &mut extracted.categories,
        ] {
            for item in list.iter_mut() {
                *item = normalize_name(item);
            }
            list.retain(|item| !item.is_empty());
            list.dedup();
        }
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "The API Gateway pattern routes requests to services. \
        An api gateway terminates TLS and applies rate limiting. \
        The gateway forwards each request to the right service. \
        Rate limiting protects upstream services from overload.";

    #[tokio::test]
    async fn test_extracts_title_case_terms() {
        let extracted = HeuristicExtractor::new().extract(SAMPLE).await.unwrap();
        assert!(extracted
            .technical_terms
            .contains(&"api gateway".to_string()));
        assert!(extracted
            .primary_concepts
            .contains(&"api gateway".to_string()));
    }

    #[tokio::test]
    async fn test_extracts_frequent_terms() {
        let extracted = HeuristicExtractor::new().extract(SAMPLE).await.unwrap();
        assert!(extracted.primary_concepts.iter().any(|c| c == "gateway"));
        assert!(extracted
            .primary_concepts
            .iter()
            .any(|c| c == "rate limiting"));
    }

    #[tokio::test]
    async fn test_empty_text() {
        let extracted = HeuristicExtractor::new().extract("").await.unwrap();
        assert!(extracted.primary_concepts.is_empty());
        assert!(extracted.categories.is_empty());
    }

    #[tokio::test]
    async fn test_extraction_is_deterministic() {
        let extractor = HeuristicExtractor::new();
        let a = extractor.extract(SAMPLE).await.unwrap();
        let b = extractor.extract(SAMPLE).await.unwrap();
        assert_eq!(a.primary_concepts, b.primary_concepts);
        assert_eq!(a.categories, b.categories);
    }

    #[tokio::test]
    async fn test_stop_words_excluded() {
        let extracted = HeuristicExtractor::new()
            .extract("the the the and and and for for for")
            .await
            .unwrap();
        assert!(extracted.primary_concepts.is_empty());
    }
}
