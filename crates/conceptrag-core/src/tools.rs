//! Tool contracts
//!
//! Transport-agnostic implementations of the tool surface. Each function
//! borrows the wired [`Container`], runs under the resilience kernel,
//! and returns serde-serializable payloads; the MCP server and the CLI
//! are thin shells over these.

use crate::cache::ResultCacheKey;
use crate::container::Container;
use crate::db::{Visual, VisualType};
use crate::error::{ConceptRagError, Result};
use crate::search::{
    category_did_you_mean, category_documents, concept_chunks, find_category_children,
    hierarchical_search, hierarchy_path, resolve_category, HierarchicalResult, ScoreBreakdown,
};
use crate::seed::ExtractedConcepts;
use serde::{Deserialize, Serialize};

/// Default and maximum result limits at the tool boundary
pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

fn clamp_limit(limit: Option<usize>) -> Result<usize> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(ConceptRagError::Validation(
            "limit must be positive".into(),
        ));
    }
    Ok(limit.min(MAX_LIMIT))
}

/// Catalog hit returned by `catalog_search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSearchItem {
    pub id: u32,
    pub source: String,
    pub title: String,
    pub summary: String,
    pub doc_type: String,
    pub categories: Vec<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<ScoreBreakdown>,
}

/// Chunk hit returned by the chunk search tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkItem {
    pub chunk_id: u32,
    pub catalog_id: u32,
    pub source: String,
    pub title: String,
    pub text: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub concept_names: Vec<String>,
}

/// Response of `concept_search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptSearchResponse {
    pub concept_id: Option<u32>,
    pub chunks: Vec<ConceptChunkItem>,
    pub image_ids: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptChunkItem {
    pub chunk_id: u32,
    pub catalog_id: u32,
    pub text: String,
    pub distance: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub concept_names: Vec<String>,
}

/// Concept summary row for listing tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptItem {
    pub id: u32,
    pub concept: String,
    pub summary: String,
    pub weight: f64,
    pub document_count: usize,
    pub synonyms: Vec<String>,
}

/// Catalog row for `concept_sources`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: u32,
    pub source: String,
    pub title: String,
    pub summary: String,
    pub doc_type: String,
}

/// Category row for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryItem {
    pub id: u32,
    pub category: String,
    pub description: String,
    pub document_count: u32,
    pub chunk_count: u32,
    pub concept_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryListing {
    pub categories: Vec<CategoryItem>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category: CategoryItem,
    pub documents: Vec<CatalogItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<ChunkItem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptListing {
    pub category: String,
    pub concepts: Vec<ConceptItem>,
    pub total: usize,
}

/// Sort orders accepted by the listing tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListSort {
    #[default]
    Name,
    Documents,
    Concepts,
    Weight,
}

/// `get_visuals` filter set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisualsQuery {
    pub ids: Option<Vec<u32>>,
    pub catalog_id: Option<u32>,
    pub visual_type: Option<String>,
    pub limit: Option<usize>,
}

/// Store and resilience status
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub documents: usize,
    pub chunks: usize,
    pub concepts: usize,
    pub categories: usize,
    pub visuals: usize,
    pub healthy: bool,
    pub open_circuits: Vec<String>,
    pub saturated_bulkheads: Vec<String>,
}

fn concept_names(container: &Container, ids: &[u32]) -> Vec<String> {
    container.ids.concepts.get_names(ids)
}

fn category_names(container: &Container, ids: &[u32]) -> Vec<String> {
    container.ids.categories.get_names(ids)
}

/// Hybrid ranking over the catalog
pub async fn catalog_search(
    container: &Container,
    text: &str,
    limit: Option<usize>,
    debug: bool,
) -> Result<Vec<CatalogSearchItem>> {
    let limit = clamp_limit(limit)?;
    let key = ResultCacheKey::new("catalog", text, limit);

    let cached = container.result_cache.get(&key);
    let items: Vec<CatalogSearchItem> = match cached {
        Some(value) => serde_json::from_value(value)?,
        None => {
            let hits = container
                .kernel
                .execute("search.catalog", &container.profiles.database, || async {
                    container.searcher().search_catalog(text, limit).await
                })
                .await?;
            let items: Vec<CatalogSearchItem> = hits
                .into_iter()
                .map(|hit| CatalogSearchItem {
                    id: hit.item.id,
                    source: hit.item.source.clone(),
                    title: hit.item.title.clone(),
                    summary: hit.item.summary.clone(),
                    doc_type: hit.item.doc_type.as_str().to_string(),
                    categories: category_names(container, &hit.item.category_ids),
                    score: hit.score,
                    debug: Some(hit.components),
                })
                .collect();
            container
                .result_cache
                .insert(key, serde_json::to_value(&items)?);
            items
        }
    };

    Ok(items
        .into_iter()
        .map(|mut item| {
            if !debug {
                item.debug = None;
            }
            item
        })
        .collect())
}

fn chunk_items(
    container: &Container,
    hits: Vec<crate::search::RankedHit<crate::search::ChunkHit>>,
) -> Vec<ChunkItem> {
    hits.into_iter()
        .map(|hit| ChunkItem {
            chunk_id: hit.item.chunk.id,
            catalog_id: hit.item.chunk.catalog_id,
            source: hit.item.source.clone(),
            title: hit.item.catalog_title.clone(),
            text: hit.item.chunk.text.clone(),
            score: hit.score,
            page_number: hit.item.chunk.page_number,
            concept_names: concept_names(container, &hit.item.chunk.concept_ids),
        })
        .collect()
}

/// Hybrid ranking over chunks, optionally scoped to one source
pub async fn chunks_search(
    container: &Container,
    text: &str,
    source: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<ChunkItem>> {
    let limit = clamp_limit(limit)?;
    let hits = container
        .kernel
        .execute("search.chunks", &container.profiles.database, || async {
            container.searcher().search_chunks(text, source, limit).await
        })
        .await?;
    Ok(chunk_items(container, hits))
}

/// Hybrid ranking over all chunks, with result caching
pub async fn broad_chunks_search(
    container: &Container,
    text: &str,
    limit: Option<usize>,
) -> Result<Vec<ChunkItem>> {
    let limit = clamp_limit(limit)?;
    let key = ResultCacheKey::new("chunks", text, limit);
    if let Some(value) = container.result_cache.get(&key) {
        return Ok(serde_json::from_value(value)?);
    }

    let hits = container
        .kernel
        .execute("search.chunks", &container.profiles.database, || async {
            container.searcher().search_chunks(text, None, limit).await
        })
        .await?;
    let items = chunk_items(container, hits);
    container
        .result_cache
        .insert(key, serde_json::to_value(&items)?);
    Ok(items)
}

/// Concept lookup via the verified vector path
pub async fn concept_search(
    container: &Container,
    concept: &str,
    limit: Option<usize>,
) -> Result<ConceptSearchResponse> {
    let limit = clamp_limit(limit)?;
    let (concept_id, hits) = container
        .kernel
        .execute("search.concept", &container.profiles.database, || async {
            concept_chunks(
                &container.db,
                &container.indexes,
                &container.ids,
                concept,
                limit,
            )
        })
        .await?;

    let image_ids = match concept_id {
        Some(id) => container.db.visual_ids_for_concept(id)?,
        None => Vec::new(),
    };

    Ok(ConceptSearchResponse {
        concept_id,
        chunks: hits
            .into_iter()
            .map(|hit| ConceptChunkItem {
                chunk_id: hit.chunk.id,
                catalog_id: hit.chunk.catalog_id,
                text: hit.chunk.text.clone(),
                distance: hit.distance,
                page_number: hit.chunk.page_number,
                concept_names: concept_names(container, &hit.chunk.concept_ids),
            })
            .collect(),
        image_ids,
    })
}

/// Concept -> sources -> densest chunks composition
pub fn concept_hierarchy(
    container: &Container,
    concept: &str,
    max_sources: usize,
    max_chunks: usize,
) -> Result<HierarchicalResult> {
    hierarchical_search(
        &container.db,
        &container.ids,
        concept,
        max_sources.clamp(1, MAX_LIMIT),
        max_chunks.clamp(1, MAX_LIMIT),
    )
}

fn concept_item(concept: &crate::db::Concept) -> ConceptItem {
    ConceptItem {
        id: concept.id,
        concept: concept.concept.clone(),
        summary: concept.summary.clone(),
        weight: concept.weight,
        document_count: concept.catalog_ids.len(),
        synonyms: concept.synonyms.clone(),
    }
}

fn catalog_item(entry: &crate::db::CatalogEntry) -> CatalogItem {
    CatalogItem {
        id: entry.id,
        source: entry.source.clone(),
        title: entry.title.clone(),
        summary: entry.summary.clone(),
        doc_type: entry.doc_type.as_str().to_string(),
    }
}

/// Concepts appearing in one document, by source path or numeric id
pub fn source_concepts(container: &Container, source: &str) -> Result<Vec<ConceptItem>> {
    let entry = match container.db.get_catalog_by_source(source)? {
        Some(entry) => Some(entry),
        None => match source.parse::<u32>() {
            Ok(id) => container.db.get_catalog_entry(id)?,
            Err(_) => None,
        },
    };
    let Some(entry) = entry else {
        return Err(ConceptRagError::SourceNotFound(source.to_string()));
    };

    let mut concepts: Vec<ConceptItem> = container
        .db
        .concepts_for_catalog(entry.id)?
        .iter()
        .map(concept_item)
        .collect();
    concepts.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.concept.cmp(&b.concept))
    });
    Ok(concepts)
}

/// Documents a concept appears in
pub fn concept_sources(container: &Container, concept: &str) -> Result<Vec<CatalogItem>> {
    let Some(concept_id) = container.ids.concepts.get_id(concept) else {
        return Ok(Vec::new());
    };
    let Some(row) = container.db.get_concept(concept_id)? else {
        return Ok(Vec::new());
    };

    let mut sources = Vec::with_capacity(row.catalog_ids.len());
    for catalog_id in &row.catalog_ids {
        if let Some(entry) = container.db.get_catalog_entry(*catalog_id)? {
            sources.push(catalog_item(&entry));
        }
    }
    Ok(sources)
}

/// Run concept extraction over ad-hoc text
pub async fn extract_concepts(container: &Container, text: &str) -> Result<ExtractedConcepts> {
    if text.trim().is_empty() {
        return Err(ConceptRagError::Validation(
            "document_query must not be empty".into(),
        ));
    }
    container
        .kernel
        .execute("concept_extraction", &container.profiles.llm_api, || async {
            container.extractor.extract(text).await
        })
        .await
}

fn category_item(
    container: &Container,
    category: &crate::db::Category,
    include_hierarchy: bool,
) -> Result<CategoryItem> {
    let hierarchy = if include_hierarchy {
        Some(hierarchy_path(&container.db, category.id)?)
    } else {
        None
    };
    Ok(CategoryItem {
        id: category.id,
        category: category.category.clone(),
        description: category.description.clone(),
        document_count: category.document_count,
        chunk_count: category.chunk_count,
        concept_count: category.concept_count,
        hierarchy,
    })
}

/// List categories with optional filter and hierarchy paths
pub fn list_categories(
    container: &Container,
    sort_by: ListSort,
    limit: Option<usize>,
    include_hierarchy: bool,
    filter: Option<&str>,
) -> Result<CategoryListing> {
    let limit = clamp_limit(limit)?;
    let mut categories = container.db.scan_categories(usize::MAX >> 1)?;
    if let Some(filter) = filter {
        let needle = filter.trim().to_lowercase();
        categories.retain(|c| c.category.contains(&needle));
    }
    let total = categories.len();

    match sort_by {
        ListSort::Name => categories.sort_by(|a, b| a.category.cmp(&b.category)),
        ListSort::Documents => categories.sort_by(|a, b| {
            b.document_count
                .cmp(&a.document_count)
                .then_with(|| a.category.cmp(&b.category))
        }),
        ListSort::Concepts | ListSort::Weight => categories.sort_by(|a, b| {
            b.concept_count
                .cmp(&a.concept_count)
                .then_with(|| a.category.cmp(&b.category))
        }),
    }
    categories.truncate(limit);

    let categories = categories
        .iter()
        .map(|c| category_item(container, c, include_hierarchy))
        .collect::<Result<Vec<_>>>()?;
    Ok(CategoryListing { categories, total })
}

/// Resolve a category and return its documents (and optionally chunks)
pub async fn category_search(
    container: &Container,
    category: &str,
    include_children: bool,
    include_chunks: bool,
    limit: Option<usize>,
) -> Result<CategoryResult> {
    let limit = clamp_limit(limit)?;
    let Some(resolved) = resolve_category(&container.db, category)? else {
        return Err(ConceptRagError::CategoryNotFound(category.to_string()));
    };

    let mut documents = category_documents(&container.db, resolved.id, include_children)?;
    documents.truncate(limit);

    let chunks = if include_chunks {
        // Representative chunks ranked against the category name
        let hits = container
            .searcher()
            .search_chunks(&resolved.category, None, limit)
            .await?;
        let scoped: Vec<ChunkItem> = chunk_items(container, hits)
            .into_iter()
            .filter(|item| documents.iter().any(|d| d.id == item.catalog_id))
            .collect();
        Some(scoped)
    } else {
        None
    };

    Ok(CategoryResult {
        category: category_item(container, &resolved, true)?,
        documents: documents.iter().map(catalog_item).collect(),
        chunks,
    })
}

/// Suggestions after a failed category resolution
pub fn category_suggestions(container: &Container, category: &str) -> Vec<String> {
    category_did_you_mean(&container.db, category).unwrap_or_default()
}

/// Concepts appearing in a category's documents
pub fn list_concepts_in_category(
    container: &Container,
    category: &str,
    sort_by: ListSort,
    limit: Option<usize>,
) -> Result<ConceptListing> {
    let limit = clamp_limit(limit)?;
    let Some(resolved) = resolve_category(&container.db, category)? else {
        return Err(ConceptRagError::CategoryNotFound(category.to_string()));
    };

    let mut docs: Vec<u32> = container
        .db
        .find_catalog_by_category(resolved.id)?
        .iter()
        .map(|d| d.id)
        .collect();
    for child in find_category_children(&container.db, resolved.id)? {
        docs.extend(
            container
                .db
                .find_catalog_by_category(child.id)?
                .iter()
                .map(|d| d.id),
        );
    }

    let mut concepts: Vec<ConceptItem> = container
        .db
        .scan_concepts(usize::MAX >> 1)?
        .iter()
        .filter(|c| c.catalog_ids.iter().any(|id| docs.contains(id)))
        .map(concept_item)
        .collect();
    let total = concepts.len();

    match sort_by {
        ListSort::Name => concepts.sort_by(|a, b| a.concept.cmp(&b.concept)),
        ListSort::Documents => concepts.sort_by(|a, b| {
            b.document_count
                .cmp(&a.document_count)
                .then_with(|| a.concept.cmp(&b.concept))
        }),
        ListSort::Weight | ListSort::Concepts => concepts.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.concept.cmp(&b.concept))
        }),
    }
    concepts.truncate(limit);

    Ok(ConceptListing {
        category: resolved.category,
        concepts,
        total,
    })
}

/// Fetch visuals by ids, document, or type
pub fn get_visuals(container: &Container, query: &VisualsQuery) -> Result<Vec<Visual>> {
    let limit = clamp_limit(query.limit)?;
    let visual_type = match query.visual_type.as_deref() {
        Some(raw) => Some(VisualType::parse(raw).ok_or_else(|| {
            ConceptRagError::Validation(format!("unknown visual_type: {}", raw))
        })?),
        None => None,
    };

    if let Some(ref ids) = query.ids {
        let mut visuals = container.db.get_visuals_by_ids(ids)?;
        if let Some(vt) = visual_type {
            visuals.retain(|v| v.visual_type == vt);
        }
        visuals.truncate(limit);
        return Ok(visuals);
    }

    if let Some(catalog_id) = query.catalog_id {
        return container
            .db
            .get_visuals_for_catalog(catalog_id, visual_type, limit);
    }

    match visual_type {
        Some(vt) => container.db.get_visuals_by_type(vt, limit),
        None => Err(ConceptRagError::Validation(
            "get_visuals needs ids, catalog_id, or visual_type".into(),
        )),
    }
}

/// Store row counts plus resilience health
pub fn status(container: &Container) -> Result<StatusReport> {
    let health = container.kernel.health_summary();
    Ok(StatusReport {
        documents: container.db.count_catalog()?,
        chunks: container.db.count_chunks()?,
        concepts: container.db.count_concepts()?,
        categories: container.db.count_categories()?,
        visuals: container.db.count_visuals()?,
        healthy: health.is_healthy(),
        open_circuits: health.open_circuits,
        saturated_bulkheads: health.saturated_bulkheads,
    })
}
