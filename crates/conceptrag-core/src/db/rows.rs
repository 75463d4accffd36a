//! Typed row models
//!
//! Cross-references between entities are integer IDs only, never
//! pointers. Array-valued columns are stored as JSON text and parsed
//! through [`parse_array_field`], which is the single place heterogeneous
//! store values become typed sequences; raw rows never leave the db
//! layer.

use serde::{Deserialize, Serialize};

/// Document type recorded on catalog entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Book,
    Paper,
    Article,
    Unknown,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Paper => "paper",
            Self::Article => "article",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "book" => Self::Book,
            "paper" => Self::Paper,
            "article" => Self::Article,
            _ => Self::Unknown,
        }
    }
}

/// One catalog row per document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u32,
    pub source: String,
    pub hash: String,
    pub title: String,
    pub summary: String,
    pub doc_type: DocType,
    pub category_ids: Vec<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,
    pub complete: bool,
}

/// Text segment extracted from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u32,
    pub catalog_id: u32,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,
    pub concept_ids: Vec<u32>,
    pub concept_density: Option<f64>,
    pub page_number: Option<u32>,
    pub token_count: usize,
    pub byte_offset: usize,
}

/// Normalized term discovered in documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub id: u32,
    pub concept: String,
    pub summary: String,
    pub catalog_ids: Vec<u32>,
    pub related_concept_ids: Vec<u32>,
    pub synonyms: Vec<String>,
    pub broader_terms: Vec<String>,
    pub narrower_terms: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,
    pub weight: f64,
}

/// Category row; hierarchy is a forest via parent links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub category: String,
    pub description: String,
    pub parent_category_id: Option<u32>,
    pub aliases: Vec<String>,
    pub related_categories: Vec<String>,
    pub document_count: u32,
    pub chunk_count: u32,
    pub concept_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,
}

/// Visual kinds stored in the auxiliary table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualType {
    Diagram,
    Flowchart,
    Chart,
    Table,
    Figure,
}

impl VisualType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagram => "diagram",
            Self::Flowchart => "flowchart",
            Self::Chart => "chart",
            Self::Table => "table",
            Self::Figure => "figure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "diagram" => Some(Self::Diagram),
            "flowchart" => Some(Self::Flowchart),
            "chart" => Some(Self::Chart),
            "table" => Some(Self::Table),
            "figure" => Some(Self::Figure),
            _ => None,
        }
    }
}

/// Figure/diagram extracted from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visual {
    pub id: u32,
    pub catalog_id: u32,
    pub catalog_title: String,
    pub image_path: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,
    pub visual_type: VisualType,
    pub page_number: Option<u32>,
    pub bounding_box: Option<serde_json::Value>,
    pub concept_ids: Vec<u32>,
    pub concept_names: Vec<String>,
    pub chunk_ids: Vec<u32>,
}

/// Parse an array-valued field arriving as a native JSON array or as a
/// JSON string containing one. Anything else yields an empty sequence.
pub fn parse_array_field<T: serde::de::DeserializeOwned>(value: &serde_json::Value) -> Vec<T> {
    match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value(value.clone()).unwrap_or_default()
        }
        serde_json::Value::String(s) => serde_json::from_str(s).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Parse a JSON-encoded id array column
pub fn parse_id_array(text: &str) -> Vec<u32> {
    serde_json::from_str::<Vec<u32>>(text).unwrap_or_default()
}

/// Parse a JSON-encoded string array column
pub fn parse_string_array(text: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(text).unwrap_or_default()
}

/// Encode an id array for storage
pub fn encode_id_array(ids: &[u32]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Encode a string array for storage
pub fn encode_string_array(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_array_field_native_array() {
        let ids: Vec<u32> = parse_array_field(&json!([1, 2, 3]));
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_array_field_json_string() {
        let ids: Vec<u32> = parse_array_field(&json!("[4, 5]"));
        assert_eq!(ids, vec![4, 5]);

        let names: Vec<String> = parse_array_field(&json!(r#"["a", "b"]"#));
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_parse_array_field_garbage_is_empty() {
        let ids: Vec<u32> = parse_array_field(&json!(42));
        assert!(ids.is_empty());
        let ids: Vec<u32> = parse_array_field(&json!("not json"));
        assert!(ids.is_empty());
    }

    #[test]
    fn test_id_array_roundtrip() {
        let ids = vec![7u32, 4_294_967_295];
        assert_eq!(parse_id_array(&encode_id_array(&ids)), ids);
        assert!(parse_id_array("").is_empty());
    }

    #[test]
    fn test_doc_type_parse() {
        assert_eq!(DocType::parse("book"), DocType::Book);
        assert_eq!(DocType::parse("garbage"), DocType::Unknown);
    }

    #[test]
    fn test_visual_type_parse() {
        assert_eq!(VisualType::parse("flowchart"), Some(VisualType::Flowchart));
        assert_eq!(VisualType::parse("meme"), None);
    }
}
