//! MCP tool definitions and handlers

use crate::protocol::*;
use conceptrag_core::tools::{self, ListSort, VisualsQuery};
use conceptrag_core::{ConceptRagError, Container};
use serde_json::Value;

pub fn catalog_search_definition() -> ToolDefinition {
    ToolDefinition {
        name: "catalog_search".to_string(),
        description: "Hybrid search over the document catalog (vector + BM25 + title + lexical)"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Natural language query" },
                "limit": { "type": "integer", "description": "Maximum results (default: 10)", "default": 10 },
                "debug": { "type": "boolean", "description": "Include component scores", "default": false }
            },
            "required": ["text"]
        }),
    }
}

pub fn chunks_search_definition() -> ToolDefinition {
    ToolDefinition {
        name: "chunks_search".to_string(),
        description: "Hybrid search over text chunks, optionally scoped to one source document"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Natural language query" },
                "source": { "type": "string", "description": "Restrict to this source path" },
                "limit": { "type": "integer", "description": "Maximum results (default: 10)", "default": 10 }
            },
            "required": ["text"]
        }),
    }
}

pub fn broad_chunks_search_definition() -> ToolDefinition {
    ToolDefinition {
        name: "broad_chunks_search".to_string(),
        description: "Hybrid search over every chunk in the library".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Natural language query" },
                "limit": { "type": "integer", "description": "Maximum results (default: 10)", "default": 10 }
            },
            "required": ["text"]
        }),
    }
}

pub fn concept_search_definition() -> ToolDefinition {
    ToolDefinition {
        name: "concept_search".to_string(),
        description: "Chunks tagged with a known concept, nearest first, with associated visuals"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "concept": { "type": "string", "description": "Concept name, e.g. 'API gateway'" },
                "limit": { "type": "integer", "description": "Maximum chunks (default: 10)", "default": 10 }
            },
            "required": ["concept"]
        }),
    }
}

pub fn concept_hierarchy_definition() -> ToolDefinition {
    ToolDefinition {
        name: "concept_hierarchy".to_string(),
        description: "Concept overview: source documents and their most concept-dense chunks"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "concept": { "type": "string", "description": "Concept name" },
                "maxSources": { "type": "integer", "description": "Maximum source documents (default: 5)", "default": 5 },
                "maxChunks": { "type": "integer", "description": "Maximum chunk previews across sources (default: 10)", "default": 10 }
            },
            "required": ["concept"]
        }),
    }
}

pub fn source_concepts_definition() -> ToolDefinition {
    ToolDefinition {
        name: "source_concepts".to_string(),
        description: "Concepts appearing in one document, by source path or catalog id".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "source": { "type": "string", "description": "Source path or numeric catalog id" }
            },
            "required": ["source"]
        }),
    }
}

pub fn concept_sources_definition() -> ToolDefinition {
    ToolDefinition {
        name: "concept_sources".to_string(),
        description: "Documents a concept appears in".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "concept": { "type": "string", "description": "Concept name" }
            },
            "required": ["concept"]
        }),
    }
}

pub fn extract_concepts_definition() -> ToolDefinition {
    ToolDefinition {
        name: "extract_concepts".to_string(),
        description: "Extract primary concepts, technical terms, and categories from text"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "document_query": { "type": "string", "description": "Text to analyze" }
            },
            "required": ["document_query"]
        }),
    }
}

pub fn list_categories_definition() -> ToolDefinition {
    ToolDefinition {
        name: "list_categories".to_string(),
        description: "List categories with counts, optionally filtered and with hierarchy paths"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "sortBy": { "type": "string", "enum": ["name", "documents", "concepts"], "default": "name" },
                "limit": { "type": "integer", "description": "Maximum results (default: 10)", "default": 10 },
                "includeHierarchy": { "type": "boolean", "default": false },
                "filter": { "type": "string", "description": "Substring filter on category names" }
            }
        }),
    }
}

pub fn category_search_definition() -> ToolDefinition {
    ToolDefinition {
        name: "category_search".to_string(),
        description: "Resolve a category (name, id, alias, or fuzzy) and return its documents"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "category": { "type": "string", "description": "Category name, id, or alias" },
                "includeChildren": { "type": "boolean", "default": false },
                "includeChunks": { "type": "boolean", "default": false },
                "limit": { "type": "integer", "description": "Maximum results (default: 10)", "default": 10 }
            },
            "required": ["category"]
        }),
    }
}

pub fn list_concepts_in_category_definition() -> ToolDefinition {
    ToolDefinition {
        name: "list_concepts_in_category".to_string(),
        description: "Concepts appearing in a category's documents".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "category": { "type": "string", "description": "Category name, id, or alias" },
                "sortBy": { "type": "string", "enum": ["name", "documents", "weight"], "default": "weight" },
                "limit": { "type": "integer", "description": "Maximum results (default: 10)", "default": 10 }
            },
            "required": ["category"]
        }),
    }
}

pub fn get_visuals_definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_visuals".to_string(),
        description: "Fetch visuals by ids, document, or type".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "ids": { "type": "array", "items": { "type": "integer" } },
                "catalog_id": { "type": "integer" },
                "visual_type": { "type": "string", "enum": ["diagram", "flowchart", "chart", "table", "figure"] },
                "limit": { "type": "integer", "description": "Maximum results (default: 10)", "default": 10 }
            }
        }),
    }
}

pub fn status_definition() -> ToolDefinition {
    ToolDefinition {
        name: "status".to_string(),
        description: "Store row counts and resilience health".to_string(),
        input_schema: serde_json::json!({ "type": "object", "properties": {} }),
    }
}

fn arg_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

fn arg_usize(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(|v| v.as_u64()).map(|v| v as usize)
}

fn arg_bool(args: &Value, key: &str) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn parse_sort(args: &Value, default: ListSort) -> ListSort {
    match arg_str(args, "sortBy") {
        Some("name") => ListSort::Name,
        Some("documents") => ListSort::Documents,
        Some("concepts") => ListSort::Concepts,
        Some("weight") => ListSort::Weight,
        _ => default,
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ConceptRagError> {
    arg_str(args, key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ConceptRagError::Validation(format!("missing required argument: {}", key)))
}

/// Dispatch a tool call to the core implementation
pub async fn handle_tool_call(container: &Container, name: &str, args: &Value) -> ToolResult {
    let result = dispatch(container, name, args).await;
    match result {
        Ok(value) => ToolResult::json(value),
        Err(error) => {
            let did_you_mean = match &error {
                ConceptRagError::CategoryNotFound(reference) => {
                    Some(tools::category_suggestions(container, reference))
                }
                _ => None,
            };
            ToolResult::tool_error(error.kind(), &error.to_string(), did_you_mean)
        }
    }
}

async fn dispatch(
    container: &Container,
    name: &str,
    args: &Value,
) -> Result<Value, ConceptRagError> {
    match name {
        "catalog_search" => {
            let text = required_str(args, "text")?;
            let items = tools::catalog_search(
                container,
                text,
                arg_usize(args, "limit"),
                arg_bool(args, "debug"),
            )
            .await?;
            Ok(serde_json::to_value(items)?)
        }
        "chunks_search" => {
            let text = required_str(args, "text")?;
            let items = tools::chunks_search(
                container,
                text,
                arg_str(args, "source"),
                arg_usize(args, "limit"),
            )
            .await?;
            Ok(serde_json::to_value(items)?)
        }
        "broad_chunks_search" => {
            let text = required_str(args, "text")?;
            let items =
                tools::broad_chunks_search(container, text, arg_usize(args, "limit")).await?;
            Ok(serde_json::to_value(items)?)
        }
        "concept_search" => {
            let concept = required_str(args, "concept")?;
            let response =
                tools::concept_search(container, concept, arg_usize(args, "limit")).await?;
            Ok(serde_json::to_value(response)?)
        }
        "concept_hierarchy" => {
            let concept = required_str(args, "concept")?;
            let result = tools::concept_hierarchy(
                container,
                concept,
                arg_usize(args, "maxSources").unwrap_or(5),
                arg_usize(args, "maxChunks").unwrap_or(10),
            )?;
            Ok(serde_json::to_value(result)?)
        }
        "source_concepts" => {
            let source = required_str(args, "source")?;
            let concepts = tools::source_concepts(container, source)?;
            Ok(serde_json::to_value(concepts)?)
        }
        "concept_sources" => {
            let concept = required_str(args, "concept")?;
            let sources = tools::concept_sources(container, concept)?;
            Ok(serde_json::to_value(sources)?)
        }
        "extract_concepts" => {
            let text = required_str(args, "document_query")?;
            let extracted = tools::extract_concepts(container, text).await?;
            Ok(serde_json::to_value(extracted)?)
        }
        "list_categories" => {
            let listing = tools::list_categories(
                container,
                parse_sort(args, ListSort::Name),
                arg_usize(args, "limit"),
                arg_bool(args, "includeHierarchy"),
                arg_str(args, "filter"),
            )?;
            Ok(serde_json::to_value(listing)?)
        }
        "category_search" => {
            let category = required_str(args, "category")?;
            let result = tools::category_search(
                container,
                category,
                arg_bool(args, "includeChildren"),
                arg_bool(args, "includeChunks"),
                arg_usize(args, "limit"),
            )
            .await?;
            Ok(serde_json::to_value(result)?)
        }
        "list_concepts_in_category" => {
            let category = required_str(args, "category")?;
            let listing = tools::list_concepts_in_category(
                container,
                category,
                parse_sort(args, ListSort::Weight),
                arg_usize(args, "limit"),
            )?;
            Ok(serde_json::to_value(listing)?)
        }
        "get_visuals" => {
            let query = VisualsQuery {
                ids: args.get("ids").and_then(|v| {
                    serde_json::from_value::<Vec<u32>>(v.clone()).ok()
                }),
                catalog_id: args.get("catalog_id").and_then(|v| v.as_u64()).map(|v| v as u32),
                visual_type: arg_str(args, "visual_type").map(String::from),
                limit: arg_usize(args, "limit"),
            };
            let visuals = tools::get_visuals(container, &query)?;
            Ok(serde_json::to_value(visuals)?)
        }
        "status" => {
            let report = tools::status(container)?;
            Ok(serde_json::to_value(report)?)
        }
        _ => Err(ConceptRagError::Validation(format!(
            "unknown tool: {}",
            name
        ))),
    }
}
