//! Visuals table operations

use super::rows::{parse_id_array, parse_string_array, Visual, VisualType};
use super::vectors::{bytes_to_embedding, embedding_to_bytes};
use super::{encode_id_array, encode_string_array, Database};
use crate::error::Result;
use rusqlite::{params, Row};

const VISUAL_COLUMNS: &str = "id, catalog_id, catalog_title, image_path, description, vector, \
                              visual_type, page_number, bounding_box, concept_ids, concept_names, chunk_ids";

fn map_visual_row(row: &Row) -> rusqlite::Result<Visual> {
    let id: i64 = row.get(0)?;
    let catalog_id: i64 = row.get(1)?;
    let vector: Option<Vec<u8>> = row.get(5)?;
    let visual_type: String = row.get(6)?;
    let page_number: Option<i64> = row.get(7)?;
    let bounding_box: Option<String> = row.get(8)?;
    let concept_ids: String = row.get(9)?;
    let concept_names: String = row.get(10)?;
    let chunk_ids: String = row.get(11)?;
    Ok(Visual {
        id: id as u32,
        catalog_id: catalog_id as u32,
        catalog_title: row.get(2)?,
        image_path: row.get(3)?,
        description: row.get(4)?,
        vector: vector.map(|b| bytes_to_embedding(&b)).unwrap_or_default(),
        visual_type: VisualType::parse(&visual_type).unwrap_or(VisualType::Figure),
        page_number: page_number.map(|p| p as u32),
        bounding_box: bounding_box.and_then(|b| serde_json::from_str(&b).ok()),
        concept_ids: parse_id_array(&concept_ids),
        concept_names: parse_string_array(&concept_names),
        chunk_ids: parse_id_array(&chunk_ids),
    })
}

impl Database {
    /// Insert or replace a visual
    pub fn upsert_visual(&self, visual: &Visual) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO visuals
             (id, catalog_id, catalog_title, image_path, description, vector, visual_type,
              page_number, bounding_box, concept_ids, concept_names, chunk_ids)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                visual.id as i64,
                visual.catalog_id as i64,
                visual.catalog_title,
                visual.image_path,
                visual.description,
                if visual.vector.is_empty() {
                    None
                } else {
                    Some(embedding_to_bytes(&visual.vector))
                },
                visual.visual_type.as_str(),
                visual.page_number.map(|p| p as i64),
                visual
                    .bounding_box
                    .as_ref()
                    .map(|b| b.to_string()),
                encode_id_array(&visual.concept_ids),
                encode_string_array(&visual.concept_names),
                encode_id_array(&visual.chunk_ids),
            ],
        )?;
        Ok(())
    }

    /// Get visuals by explicit ids, preserving request order
    pub fn get_visuals_by_ids(&self, ids: &[u32]) -> Result<Vec<Visual>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let result = self.conn.query_row(
                &format!("SELECT {} FROM visuals WHERE id = ?1", VISUAL_COLUMNS),
                params![*id as i64],
                map_visual_row,
            );
            match result {
                Ok(visual) => out.push(visual),
                Err(rusqlite::Error::QueryReturnedNoRows) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }

    /// Visuals belonging to a document, optionally filtered by type
    pub fn get_visuals_for_catalog(
        &self,
        catalog_id: u32,
        visual_type: Option<VisualType>,
        limit: usize,
    ) -> Result<Vec<Visual>> {
        let mut sql = format!(
            "SELECT {} FROM visuals WHERE catalog_id = ?1",
            VISUAL_COLUMNS
        );
        if visual_type.is_some() {
            sql.push_str(" AND visual_type = ?3");
        }
        sql.push_str(" ORDER BY id LIMIT ?2");

        let mut stmt = self.conn.prepare(&sql)?;
        let visuals = match visual_type {
            Some(vt) => stmt
                .query_map(
                    params![catalog_id as i64, limit as i64, vt.as_str()],
                    map_visual_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![catalog_id as i64, limit as i64], map_visual_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        Ok(visuals)
    }

    /// Scan visuals of one type across all documents
    pub fn get_visuals_by_type(&self, visual_type: VisualType, limit: usize) -> Result<Vec<Visual>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM visuals WHERE visual_type = ?1 ORDER BY id LIMIT ?2",
            VISUAL_COLUMNS
        ))?;
        let visuals = stmt
            .query_map(params![visual_type.as_str(), limit as i64], map_visual_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(visuals)
    }

    /// Visual ids tagged with a concept
    pub fn visual_ids_for_concept(&self, concept_id: u32) -> Result<Vec<u32>> {
        let all = {
            let mut stmt = self
                .conn
                .prepare("SELECT id, concept_ids FROM visuals ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| {
                    let id: i64 = row.get(0)?;
                    let concept_ids: String = row.get(1)?;
                    Ok((id as u32, parse_id_array(&concept_ids)))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        Ok(all
            .into_iter()
            .filter(|(_, ids)| ids.contains(&concept_id))
            .map(|(id, _)| id)
            .collect())
    }

    /// Number of visual rows
    pub fn count_visuals(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM visuals", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
