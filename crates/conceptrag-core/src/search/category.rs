//! Category resolution and hierarchy walks

use crate::db::{CatalogEntry, Category, Database};
use crate::error::Result;

/// Maximum parent hops / child depth; doubles as a cycle guard
const MAX_DEPTH: usize = 10;

/// "Did you mean" suggestion count
const SUGGESTION_LIMIT: usize = 5;

/// Resolve a category reference: alias, exact name, numeric id, then
/// fuzzy substring — first hit wins. `None` when everything misses.
pub fn resolve_category(db: &Database, reference: &str) -> Result<Option<Category>> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Ok(None);
    }

    if let Some(category) = db.get_category_by_alias(reference)? {
        return Ok(Some(category));
    }

    if let Some(category) = db.get_category_by_name(reference)? {
        return Ok(Some(category));
    }

    if let Ok(id) = reference.parse::<u32>() {
        if let Some(category) = db.get_category(id)? {
            return Ok(Some(category));
        }
    }

    Ok(db
        .search_categories_by_name(reference, 1)?
        .into_iter()
        .next())
}

/// Suggestions for a failed resolution, best first
pub fn category_did_you_mean(db: &Database, reference: &str) -> Result<Vec<String>> {
    let mut suggestions: Vec<String> = db
        .search_categories_by_name(reference, SUGGESTION_LIMIT)?
        .into_iter()
        .map(|c| c.category)
        .collect();

    // Fall back to per-token matches when the whole reference misses
    if suggestions.is_empty() {
        for token in super::tokenize(reference) {
            for category in db.search_categories_by_name(&token, SUGGESTION_LIMIT)? {
                if !suggestions.contains(&category.category) {
                    suggestions.push(category.category);
                }
                if suggestions.len() >= SUGGESTION_LIMIT {
                    return Ok(suggestions);
                }
            }
        }
    }

    Ok(suggestions)
}

/// Root-to-node path of category names. Walks parent links at most
/// [`MAX_DEPTH`] hops, so a corrupt cycle terminates.
pub fn hierarchy_path(db: &Database, id: u32) -> Result<Vec<String>> {
    let mut path = Vec::new();
    let mut current = Some(id);
    for _ in 0..MAX_DEPTH {
        let Some(id) = current else {
            break;
        };
        let Some(category) = db.get_category(id)? else {
            break;
        };
        path.insert(0, category.category);
        current = category.parent_category_id;
    }
    Ok(path)
}

/// Transitive children, one level at a time, bounded by depth
pub fn find_category_children(db: &Database, id: u32) -> Result<Vec<Category>> {
    let mut children = Vec::new();
    let mut frontier = vec![id];
    for _ in 0..MAX_DEPTH {
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for parent in frontier.drain(..) {
            for child in db.category_children(parent)? {
                // A cycle would revisit an id; skip it
                if child.id != id && !children.iter().any(|c: &Category| c.id == child.id) {
                    next.push(child.id);
                    children.push(child);
                }
            }
        }
        frontier = next;
    }
    Ok(children)
}

/// Documents filed under a category, optionally aggregating its subtree
pub fn category_documents(
    db: &Database,
    id: u32,
    include_children: bool,
) -> Result<Vec<CatalogEntry>> {
    let mut documents = db.find_catalog_by_category(id)?;
    if include_children {
        for child in find_category_children(db, id)? {
            for entry in db.find_catalog_by_category(child.id)? {
                if !documents.iter().any(|d| d.id == entry.id) {
                    documents.push(entry);
                }
            }
        }
    }
    documents.sort_by_key(|d| d.id);
    Ok(documents)
}
