//! Embedded lexical relations for query broadening
//!
//! A compact WordNet-style table over the technical vocabulary this
//! library indexes: per head word, synonyms plus broader (hypernym) and
//! narrower (hyponym) terms. Lookups are pure so query expansion stays
//! deterministic.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Relations carried for one head word
#[derive(Debug, Clone, Default)]
pub struct LexEntry {
    pub synonyms: Vec<&'static str>,
    pub hypernyms: Vec<&'static str>,
    pub hyponyms: Vec<&'static str>,
}

/// (head, synonyms, hypernyms, hyponyms)
type RawEntry = (
    &'static str,
    &'static [&'static str],
    &'static [&'static str],
    &'static [&'static str],
);

const ENTRIES: &[RawEntry] = &[
    ("gateway", &["proxy", "router"], &["service"], &["api"]),
    ("api", &["interface", "endpoint"], &["contract"], &["rest", "rpc"]),
    ("search", &["query", "lookup", "retrieval"], &["operation"], &["scan"]),
    ("query", &["search", "request"], &["operation"], &["lookup"]),
    ("database", &["datastore", "store"], &["system"], &["sqlite", "postgres"]),
    ("cache", &["buffer", "memo"], &["storage"], &["lru"]),
    ("index", &["catalog", "registry"], &["structure"], &["btree", "hnsw"]),
    ("vector", &["embedding"], &["representation"], &[]),
    ("embedding", &["vector", "encoding"], &["representation"], &[]),
    ("concept", &["term", "notion", "idea"], &["abstraction"], &[]),
    ("category", &["class", "group", "taxonomy"], &["classification"], &[]),
    ("document", &["file", "text", "paper"], &["record"], &["book", "article"]),
    ("chunk", &["segment", "fragment", "passage"], &["unit"], &[]),
    ("distributed", &["decentralized"], &["parallel"], &["replicated"]),
    ("system", &["platform", "architecture"], &[], &["service"]),
    ("service", &["component", "daemon"], &["system"], &["microservice"]),
    ("network", &["net"], &["infrastructure"], &["lan", "mesh"]),
    ("server", &["host", "backend"], &["machine"], &[]),
    ("client", &["consumer", "caller"], &[], &[]),
    ("message", &["event", "packet"], &["datum"], &[]),
    ("queue", &["buffer", "channel"], &["structure"], &["fifo"]),
    ("stream", &["flow", "pipeline"], &["sequence"], &[]),
    ("error", &["failure", "fault"], &["condition"], &["timeout", "panic"]),
    ("failure", &["error", "fault", "outage"], &["condition"], &[]),
    ("retry", &["reattempt"], &["recovery"], &["backoff"]),
    ("timeout", &["deadline", "expiry"], &["limit"], &[]),
    ("replication", &["mirroring", "copying"], &["redundancy"], &[]),
    ("sharding", &["partitioning", "splitting"], &["scaling"], &[]),
    ("consistency", &["coherence"], &["guarantee"], &["linearizability"]),
    ("transaction", &["txn"], &["operation"], &["commit", "rollback"]),
    ("storage", &["persistence"], &["infrastructure"], &["disk", "blob"]),
    ("encryption", &["ciphering"], &["security"], &["aes", "tls"]),
    ("security", &["protection", "safety"], &[], &["auth", "encryption"]),
    ("scaling", &["scalability", "growth"], &[], &["sharding"]),
    ("monitoring", &["observability", "telemetry"], &["operations"], &["metrics", "tracing"]),
    ("testing", &["verification", "validation"], &["engineering"], &["fuzzing"]),
    ("ranking", &["scoring", "ordering"], &["retrieval"], &["bm25"]),
    ("clean", &["tidy", "readable"], &[], &[]),
    ("code", &["source", "program"], &["software"], &["function", "module"]),
    ("thinking", &["reasoning", "cognition"], &[], &[]),
    ("architecture", &["design", "structure"], &[], &["topology"]),
    ("pattern", &["idiom", "template"], &["design"], &[]),
];

lazy_static! {
    static ref LEXICON: HashMap<&'static str, LexEntry> = {
        let mut map = HashMap::with_capacity(ENTRIES.len());
        for (head, synonyms, hypernyms, hyponyms) in ENTRIES {
            map.insert(
                *head,
                LexEntry {
                    synonyms: synonyms.to_vec(),
                    hypernyms: hypernyms.to_vec(),
                    hyponyms: hyponyms.to_vec(),
                },
            );
        }
        map
    };
}

/// Lexical relation lookup over the embedded table
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexicon;

impl Lexicon {
    pub fn new() -> Self {
        Self
    }

    /// Relations for a single lowercase token, if known
    pub fn lookup(&self, token: &str) -> Option<&'static LexEntry> {
        LEXICON.get(token)
    }

    /// Synonyms of a token (empty when unknown)
    pub fn synonyms(&self, token: &str) -> &[&'static str] {
        self.lookup(token).map(|e| e.synonyms.as_slice()).unwrap_or(&[])
    }

    /// Hypernyms and hyponyms of a token, in that order
    pub fn related(&self, token: &str) -> Vec<&'static str> {
        match self.lookup(token) {
            Some(entry) => entry
                .hypernyms
                .iter()
                .chain(entry.hyponyms.iter())
                .copied()
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_token() {
        let lexicon = Lexicon::new();
        assert!(lexicon.synonyms("gateway").contains(&"proxy"));
        let related = lexicon.related("gateway");
        assert!(related.contains(&"service"));
        assert!(related.contains(&"api"));
    }

    #[test]
    fn test_unknown_token_is_empty() {
        let lexicon = Lexicon::new();
        assert!(lexicon.synonyms("zanzibar").is_empty());
        assert!(lexicon.related("zanzibar").is_empty());
    }

    #[test]
    fn test_lookup_is_pure() {
        let lexicon = Lexicon::new();
        assert_eq!(lexicon.synonyms("cache"), lexicon.synonyms("cache"));
    }
}
