//! Static concept-to-category mapping
//!
//! Categories are derived from the concepts a document contains: a
//! concept whose tokens hit a rule's keywords files the document under
//! that rule's category. The mapping is static so rebuilds derive the
//! same categories every time.

use crate::search::tokenize;

/// One derivable category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub description: &'static str,
    pub aliases: &'static [&'static str],
    keywords: &'static [&'static str],
}

const RULES: &[CategoryRule] = &[
    CategoryRule {
        name: "software engineering",
        parent: None,
        description: "Building and maintaining software systems",
        aliases: &["engineering"],
        keywords: &["code", "refactoring", "testing", "function", "module", "clean", "design"],
    },
    CategoryRule {
        name: "distributed systems",
        parent: Some("software engineering"),
        description: "Systems spanning multiple cooperating nodes",
        aliases: &["distributed computing"],
        keywords: &[
            "distributed", "consensus", "replication", "sharding", "cluster", "raft", "paxos",
            "gossip", "quorum",
        ],
    },
    CategoryRule {
        name: "databases",
        parent: Some("software engineering"),
        description: "Storage engines, query processing, transactions",
        aliases: &["data stores", "db"],
        keywords: &[
            "database", "sql", "transaction", "index", "btree", "storage", "query", "schema",
        ],
    },
    CategoryRule {
        name: "networking",
        parent: Some("software engineering"),
        description: "Protocols, routing, and traffic management",
        aliases: &["networks"],
        keywords: &[
            "network", "gateway", "proxy", "routing", "http", "tcp", "dns", "load", "balancer",
        ],
    },
    CategoryRule {
        name: "machine learning",
        parent: None,
        description: "Models, training, and inference",
        aliases: &["ml", "ai"],
        keywords: &[
            "learning", "model", "training", "neural", "embedding", "inference", "gradient",
        ],
    },
    CategoryRule {
        name: "information retrieval",
        parent: Some("machine learning"),
        description: "Search, ranking, and retrieval systems",
        aliases: &["search", "ir"],
        keywords: &[
            "retrieval", "ranking", "bm25", "relevance", "vector", "semantic", "search",
        ],
    },
    CategoryRule {
        name: "security",
        parent: Some("software engineering"),
        description: "Protecting systems and data",
        aliases: &["infosec"],
        keywords: &[
            "security", "encryption", "authentication", "authorization", "tls", "vulnerability",
        ],
    },
    CategoryRule {
        name: "operations",
        parent: Some("software engineering"),
        description: "Running software in production",
        aliases: &["devops", "sre"],
        keywords: &[
            "deployment", "monitoring", "observability", "incident", "reliability", "scaling",
            "kubernetes",
        ],
    },
];

/// All rules, for seeding the category table
pub fn all_rules() -> &'static [CategoryRule] {
    RULES
}

/// Categories whose keywords intersect the given concept names,
/// in rule order
pub fn derive_categories(concepts: &[String]) -> Vec<&'static CategoryRule> {
    let mut tokens = Vec::new();
    for concept in concepts {
        tokens.extend(tokenize(concept));
    }

    RULES
        .iter()
        .filter(|rule| rule.keywords.iter().any(|k| tokens.iter().any(|t| t == k)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_from_concepts() {
        let concepts = vec![
            "api gateway".to_string(),
            "consensus protocols".to_string(),
        ];
        let categories = derive_categories(&concepts);
        let names: Vec<&str> = categories.iter().map(|c| c.name).collect();
        assert!(names.contains(&"networking"));
        assert!(names.contains(&"distributed systems"));
        assert!(!names.contains(&"security"));
    }

    #[test]
    fn test_no_match_is_empty() {
        let concepts = vec!["sourdough hydration".to_string()];
        assert!(derive_categories(&concepts).is_empty());
        assert!(derive_categories(&[]).is_empty());
    }

    #[test]
    fn test_derivation_is_deterministic_and_ordered() {
        let concepts = vec!["database sharding security".to_string()];
        let a = derive_categories(&concepts);
        let b = derive_categories(&concepts);
        assert_eq!(
            a.iter().map(|c| c.name).collect::<Vec<_>>(),
            b.iter().map(|c| c.name).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_parents_exist_as_rules() {
        for rule in all_rules() {
            if let Some(parent) = rule.parent {
                assert!(
                    all_rules().iter().any(|r| r.name == parent),
                    "parent {} of {} missing",
                    parent,
                    rule.name
                );
            }
        }
    }
}
