//! Seeding orchestrator
//!
//! Stage machine over ingestion: documents -> concepts -> summaries ->
//! categories -> complete. Every stage is resumable through the
//! checkpoint file; per-document extraction results survive failed runs
//! in the stage cache. Concepts are always aggregated across the whole
//! catalog before the concept table is rebuilt, so the index is never
//! partial.

mod checkpoint;
mod chunker;
mod completeness;
mod extract;
mod loader;
mod stage_cache;
pub mod taxonomy;

pub use checkpoint::{Checkpoint, SeedStage, CHECKPOINT_VERSION};
pub use chunker::{chunk_text, TextChunk, CHUNK_OVERLAP_CHARS, CHUNK_SIZE_CHARS};
pub use completeness::{check_document, summary_is_valid, DocCompleteness};
pub use extract::{ConceptExtractor, ExtractedConcepts, HeuristicExtractor, HttpConceptExtractor};
pub use loader::{DocumentLoader, TextLoader};
pub use stage_cache::{StageCache, StageCacheEntry, STAGE_CACHE_TTL};

use crate::db::vectors::check_ingest_dim;
use crate::db::{CatalogEntry, Chunk, Concept, Database, DocType};
use crate::embed::CachedEmbedder;
use crate::error::Result;
use crate::ids::{generate_stable_id, hash_to_id, normalize_name};
use crate::search::{Lexicon, TokenizedDoc};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Text fed to the concept extractor per document
const EXTRACT_TEXT_CAP: usize = 32_000;

/// Summary preview length derived from chunk text
const SUMMARY_CHARS: usize = 300;

/// Seeding options
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedOptions {
    /// Re-ingest everything, ignoring completeness
    pub force: bool,
}

/// Outcome of one seeding run
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SeedReport {
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub documents: usize,
    pub chunks: usize,
    pub concepts: usize,
    pub categories: usize,
}

/// SHA-256 hex of document content
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn title_from(text: &str, path: &Path) -> String {
    for line in text.lines() {
        let line = line.trim().trim_start_matches('#').trim();
        if !line.is_empty() {
            return line.chars().take(120).collect();
        }
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .replace(['-', '_'], " ")
}

fn doc_type_from(source: &str) -> DocType {
    let first = source.split('/').next().unwrap_or("");
    match first {
        "books" => DocType::Book,
        "papers" => DocType::Paper,
        "articles" => DocType::Article,
        _ => DocType::Unknown,
    }
}

fn derive_summary(chunks: &[Chunk], page_count: usize) -> String {
    let Some(first) = chunks.first() else {
        return format!("Document overview ({} pages)", page_count.max(1));
    };
    let text = first.text.trim();
    let mut summary = String::new();
    for sentence in text.split_inclusive(". ") {
        if summary.len() + sentence.len() > SUMMARY_CHARS {
            break;
        }
        summary.push_str(sentence);
    }
    if summary.trim().len() < 10 {
        summary = text.chars().take(SUMMARY_CHARS).collect();
    }
    summary.trim().to_string()
}

/// The stage machine
pub struct Seeder<'a> {
    db: &'a Database,
    embedder: &'a CachedEmbedder,
    extractor: &'a dyn ConceptExtractor,
    loader: &'a dyn DocumentLoader,
    lexicon: Lexicon,
    db_dir: PathBuf,
    files_dir: PathBuf,
}

impl<'a> Seeder<'a> {
    pub fn new(
        db: &'a Database,
        embedder: &'a CachedEmbedder,
        extractor: &'a dyn ConceptExtractor,
        loader: &'a dyn DocumentLoader,
        db_dir: impl Into<PathBuf>,
        files_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            embedder,
            extractor,
            loader,
            lexicon: Lexicon::new(),
            db_dir: db_dir.into(),
            files_dir: files_dir.into(),
        }
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.db_dir.join(".seeding-checkpoint.json")
    }

    fn stage_cache(&self) -> StageCache {
        StageCache::new(&self.db_dir.join(".stage-cache"), &self.files_dir)
    }

    fn discover_files(&self) -> Result<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.files_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if entry.file_type().is_file() && self.loader.accepts(path) {
                let source = path
                    .strip_prefix(&self.files_dir)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .replace('\\', "/");
                files.push((path.to_path_buf(), source));
            }
        }
        // Deterministic processing order keeps collision resolution
        // reproducible across rebuilds
        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files)
    }

    /// Run all stages from wherever the checkpoint left off
    pub async fn run(&self, options: SeedOptions) -> Result<SeedReport> {
        std::fs::create_dir_all(&self.db_dir)?;
        let checkpoint_path = self.checkpoint_path();
        let mut checkpoint = if options.force {
            Checkpoint::new(&self.db_dir, &self.files_dir)
        } else {
            Checkpoint::load(&checkpoint_path, &self.db_dir, &self.files_dir)?
                .unwrap_or_else(|| Checkpoint::new(&self.db_dir, &self.files_dir))
        };

        let mut report = SeedReport::default();
        let files = self.discover_files()?;

        let changed = self
            .run_documents_stage(&mut checkpoint, &checkpoint_path, &files, options, &mut report)
            .await?;

        // A fully seeded library with no file changes is a no-op
        if !changed && checkpoint.stage == SeedStage::Complete && !options.force {
            report.processed = checkpoint.total_processed;
            report.failed = checkpoint.total_failed;
            report.documents = self.db.count_catalog()?;
            report.chunks = self.db.count_chunks()?;
            report.concepts = self.db.count_concepts()?;
            report.categories = self.db.count_categories()?;
            report.skipped = files.len() as u64;
            tracing::info!("seed: nothing changed, all stages skipped");
            return Ok(report);
        }

        checkpoint.stage = SeedStage::Concepts;
        checkpoint.save(&checkpoint_path)?;
        tracing::info!("seed: concepts stage");
        self.run_concepts_stage().await?;

        checkpoint.stage = SeedStage::Summaries;
        checkpoint.save(&checkpoint_path)?;
        tracing::info!("seed: summaries stage");
        self.run_summaries_stage().await?;

        checkpoint.stage = SeedStage::Categories;
        checkpoint.save(&checkpoint_path)?;
        tracing::info!("seed: categories stage");
        self.run_categories_stage().await?;

        checkpoint.stage = SeedStage::Complete;
        checkpoint.touch();
        checkpoint.save(&checkpoint_path)?;
        tracing::info!("seed: complete");

        report.processed = checkpoint.total_processed;
        report.failed = checkpoint.total_failed;
        report.documents = self.db.count_catalog()?;
        report.chunks = self.db.count_chunks()?;
        report.concepts = self.db.count_concepts()?;
        report.categories = self.db.count_categories()?;
        Ok(report)
    }

    async fn run_documents_stage(
        &self,
        checkpoint: &mut Checkpoint,
        checkpoint_path: &Path,
        files: &[(PathBuf, String)],
        options: SeedOptions,
        report: &mut SeedReport,
    ) -> Result<bool> {
        let stage_cache = self.stage_cache();
        let mut changed = false;

        let mut existing_catalog_ids: HashSet<u32> =
            self.db.scan_catalog(usize::MAX >> 1)?.iter().map(|e| e.id).collect();
        let mut existing_chunk_ids: HashSet<u32> =
            self.db.scan_chunks(usize::MAX >> 1)?.iter().map(|c| c.id).collect();
        let aliases = self.db.load_id_aliases()?;

        for (path, source) in files {
            let outcome = self
                .ingest_document(
                    path,
                    source,
                    options,
                    &stage_cache,
                    &aliases,
                    &mut existing_catalog_ids,
                    &mut existing_chunk_ids,
                )
                .await;

            match outcome {
                Ok(IngestOutcome::Skipped { hash }) => {
                    report.skipped += 1;
                    // An already-recorded skip keeps the checkpoint
                    // byte-identical, so a no-change run writes nothing
                    let already = checkpoint.processed_hashes.iter().any(|h| *h == hash);
                    if !already {
                        checkpoint.record_processed(&hash, source);
                        checkpoint.save(checkpoint_path)?;
                    }
                }
                Ok(IngestOutcome::Ingested { hash }) => {
                    changed = true;
                    checkpoint.record_processed(&hash, source);
                    checkpoint.save(checkpoint_path)?;
                }
                Err(error) => {
                    tracing::warn!(source = %source, error = %error, "document ingest failed");
                    changed = true;
                    checkpoint.record_failed(source);
                    checkpoint.save(checkpoint_path)?;
                }
            }
        }

        Ok(changed)
    }

    #[allow(clippy::too_many_arguments)]
    async fn ingest_document(
        &self,
        path: &Path,
        source: &str,
        options: SeedOptions,
        stage_cache: &StageCache,
        aliases: &HashMap<String, u32>,
        existing_catalog_ids: &mut HashSet<u32>,
        existing_chunk_ids: &mut HashSet<u32>,
    ) -> Result<IngestOutcome> {
        let text = self.loader.load(path)?;
        let hash = content_hash(&text);

        let existing = self.db.get_catalog_by_source(source)?;
        if let Some(ref entry) = existing {
            if entry.hash == hash && entry.complete && !options.force {
                tracing::debug!(source = %source, "unchanged and complete, skipping");
                return Ok(IngestOutcome::Skipped { hash });
            }
            if entry.hash != hash {
                // Content changed: whole-document cascade, then re-ingest
                tracing::info!(source = %source, "content changed, re-ingesting");
                for old in self.db.chunks_for_catalog(entry.id)? {
                    existing_chunk_ids.remove(&old.id);
                }
                self.db.delete_document(entry.id)?;
                existing_catalog_ids.remove(&entry.id);
                stage_cache.remove(&entry.hash);
            }
        }

        let catalog_id = match aliases.get(source) {
            Some(id) => *id,
            None => {
                let mut collision_set = existing_catalog_ids.clone();
                if let Some(ref entry) = existing {
                    collision_set.remove(&entry.id);
                }
                let id = generate_stable_id(source, &collision_set);
                if id != hash_to_id(source) {
                    self.db.save_id_alias(source, id)?;
                }
                id
            }
        };
        existing_catalog_ids.insert(catalog_id);

        // Intact chunks are preserved; everything else regenerates
        let completeness = completeness::check_document(self.db, catalog_id)?;
        let keep_chunks = completeness.has_chunks
            && existing.as_ref().map(|e| e.hash == hash).unwrap_or(false)
            && !options.force;

        let chunks: Vec<Chunk> = if keep_chunks {
            self.db.chunks_for_catalog(catalog_id)?
        } else {
            // Stale rows (force re-ingest) make room for fresh ones and
            // free their ids for reassignment
            for old in self.db.chunks_for_catalog(catalog_id)? {
                existing_chunk_ids.remove(&old.id);
            }
            self.db.delete_chunks_for_catalog(catalog_id)?;

            let content = text.clone();
            let raw = tokio::task::spawn_blocking(move || {
                chunk_text(&content, CHUNK_SIZE_CHARS, CHUNK_OVERLAP_CHARS)
            })
            .await
            .map_err(|e| crate::error::ConceptRagError::Seed(e.to_string()))?;

            let mut rows = Vec::with_capacity(raw.len());
            for piece in raw {
                let canonical = format!("{}:{}", source, piece.byte_offset);
                let chunk_id = match aliases.get(&canonical) {
                    Some(id) => *id,
                    None => {
                        let id = generate_stable_id(&canonical, existing_chunk_ids);
                        if id != hash_to_id(&canonical) {
                            self.db.save_id_alias(&canonical, id)?;
                        }
                        id
                    }
                };
                existing_chunk_ids.insert(chunk_id);

                let vector = self.embedder.embed(&piece.text).await?;
                check_ingest_dim(&vector, self.embedder.dimensions())?;
                rows.push(Chunk {
                    id: chunk_id,
                    catalog_id,
                    text: piece.text,
                    vector,
                    concept_ids: vec![],
                    concept_density: None,
                    page_number: piece.page_number,
                    token_count: piece.token_count,
                    byte_offset: piece.byte_offset,
                });
            }
            for chunk in &rows {
                self.db.upsert_chunk(chunk)?;
            }
            rows
        };

        // Concept extraction, reusing a prior run's work when cached;
        // the concepts stage reads it back from the stage cache
        let cached_concepts = stage_cache.get(&hash).and_then(|e| e.concepts);
        if cached_concepts.is_none() {
            let cap = text
                .char_indices()
                .nth(EXTRACT_TEXT_CAP)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            let extracted = self.extractor.extract(&text[..cap]).await?;
            let mut entry = StageCacheEntry::new(&hash, source);
            entry.concepts = Some(extracted.primary_concepts.clone());
            entry.content_overview = Some(derive_summary(&chunks, 1));
            stage_cache.put(&entry)?;
        } else {
            tracing::debug!(source = %source, "stage cache hit for concepts");
        }

        let title = title_from(&text, path);
        let page_count = text.bytes().filter(|b| *b == 0x0c).count() + 1;
        let summary = existing
            .as_ref()
            .map(|e| e.summary.clone())
            .filter(|s| summary_is_valid(s))
            .unwrap_or_else(|| derive_summary(&chunks, page_count));

        let vector = self
            .embedder
            .embed(&format!("{}\n{}", title, summary))
            .await?;
        check_ingest_dim(&vector, self.embedder.dimensions())?;

        self.db.upsert_catalog_entry(&CatalogEntry {
            id: catalog_id,
            source: source.to_string(),
            hash,
            title,
            summary,
            doc_type: doc_type_from(source),
            category_ids: existing.map(|e| e.category_ids).unwrap_or_default(),
            vector,
            complete: false,
        })?;

        let entry = self.db.get_catalog_entry(catalog_id)?;
        Ok(IngestOutcome::Ingested {
            hash: entry.map(|e| e.hash).unwrap_or_default(),
        })
    }

    /// Aggregate concepts over the whole catalog and rebuild the table
    async fn run_concepts_stage(&self) -> Result<()> {
        let stage_cache = self.stage_cache();
        let catalog = self.db.scan_catalog(usize::MAX >> 1)?;
        let total_docs = catalog.len().max(1);

        // name -> documents containing it
        let mut occurrences: BTreeMap<String, HashSet<u32>> = BTreeMap::new();
        for entry in &catalog {
            let names = match stage_cache.get(&entry.hash).and_then(|e| e.concepts) {
                Some(names) => names,
                None => {
                    let text: String = self
                        .db
                        .chunks_for_catalog(entry.id)?
                        .iter()
                        .map(|c| c.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\n");
                    let cap = text
                        .char_indices()
                        .nth(EXTRACT_TEXT_CAP)
                        .map(|(i, _)| i)
                        .unwrap_or(text.len());
                    self.extractor.extract(&text[..cap]).await?.primary_concepts
                }
            };
            for name in names {
                let name = normalize_name(&name);
                if name.is_empty() {
                    continue;
                }
                occurrences.entry(name).or_default().insert(entry.id);
            }
        }

        // Deterministic id assignment: sorted names, persisted aliases
        let aliases = self.db.load_id_aliases()?;
        let mut assigned: HashSet<u32> = HashSet::new();
        let mut concepts = Vec::with_capacity(occurrences.len());
        for (name, catalog_ids) in &occurrences {
            let id = match aliases.get(name) {
                Some(id) => *id,
                None => {
                    let id = generate_stable_id(name, &assigned);
                    if id != hash_to_id(name) {
                        self.db.save_id_alias(name, id)?;
                    }
                    id
                }
            };
            assigned.insert(id);

            let mut synonyms = Vec::new();
            let mut broader = Vec::new();
            let mut narrower = Vec::new();
            for token in crate::search::tokenize(name) {
                if let Some(entry) = self.lexicon.lookup(&token) {
                    synonyms.extend(entry.synonyms.iter().map(|s| s.to_string()));
                    broader.extend(entry.hypernyms.iter().map(|s| s.to_string()));
                    narrower.extend(entry.hyponyms.iter().map(|s| s.to_string()));
                }
            }
            synonyms.dedup();
            broader.dedup();
            narrower.dedup();

            let vector = self.embedder.embed(name).await?;
            check_ingest_dim(&vector, self.embedder.dimensions())?;

            let mut sorted_catalog_ids: Vec<u32> = catalog_ids.iter().copied().collect();
            sorted_catalog_ids.sort_unstable();

            concepts.push(Concept {
                id,
                concept: name.clone(),
                summary: String::new(),
                catalog_ids: sorted_catalog_ids,
                related_concept_ids: vec![],
                synonyms,
                broader_terms: broader,
                narrower_terms: narrower,
                vector,
                weight: (catalog_ids.len() as f64 / total_docs as f64).clamp(0.0, 1.0),
            });
        }

        // Related concepts: co-occurrence in at least one document
        let by_id: Vec<(u32, HashSet<u32>)> = concepts
            .iter()
            .map(|c| (c.id, c.catalog_ids.iter().copied().collect()))
            .collect();
        for concept in &mut concepts {
            let own: HashSet<u32> = concept.catalog_ids.iter().copied().collect();
            let mut related: Vec<u32> = by_id
                .iter()
                .filter(|(id, docs)| *id != concept.id && !docs.is_disjoint(&own))
                .map(|(id, _)| *id)
                .collect();
            related.sort_unstable();
            related.truncate(16);
            concept.related_concept_ids = related;
        }

        self.db.clear_concepts()?;
        for concept in &concepts {
            self.db.upsert_concept(concept)?;
        }
        tracing::info!(concepts = concepts.len(), "concept table rebuilt");

        // Tag chunks: a chunk carries a concept when the name appears
        // in its text with word boundaries
        let per_catalog: HashMap<u32, Vec<&Concept>> = {
            let mut map: HashMap<u32, Vec<&Concept>> = HashMap::new();
            for concept in &concepts {
                for catalog_id in &concept.catalog_ids {
                    map.entry(*catalog_id).or_default().push(concept);
                }
            }
            map
        };

        for entry in &catalog {
            let Some(doc_concepts) = per_catalog.get(&entry.id) else {
                continue;
            };
            for chunk in self.db.chunks_for_catalog(entry.id)? {
                let doc = TokenizedDoc::new(&chunk.text);
                let mut ids: Vec<u32> = doc_concepts
                    .iter()
                    .filter(|c| doc.contains_phrase(&c.concept))
                    .map(|c| c.id)
                    .collect();
                ids.sort_unstable();
                let density =
                    (ids.len() as f64 / chunk.token_count.max(1) as f64).clamp(0.0, 1.0);
                self.db
                    .set_chunk_concepts(chunk.id, entry.id, &ids, density)?;
            }
        }

        Ok(())
    }

    async fn run_summaries_stage(&self) -> Result<()> {
        for entry in self.db.scan_catalog(usize::MAX >> 1)? {
            if !summary_is_valid(&entry.summary) {
                let chunks = self.db.chunks_for_catalog(entry.id)?;
                let summary = derive_summary(&chunks, 1);
                self.db.set_catalog_summary(entry.id, &summary)?;
            }
        }

        for concept in self.db.scan_concepts(usize::MAX >> 1)? {
            if summary_is_valid(&concept.summary) {
                continue;
            }
            let summary = format!(
                "Term covered in {} document{} of the library.",
                concept.catalog_ids.len(),
                if concept.catalog_ids.len() == 1 { "" } else { "s" }
            );
            self.db.set_concept_summary(concept.id, &summary)?;

            // Vector covers name + summary once the summary exists
            let vector = self
                .embedder
                .embed(&format!("{}\n{}", concept.concept, summary))
                .await?;
            let mut updated = concept.clone();
            updated.summary = summary;
            updated.vector = vector;
            self.db.upsert_concept(&updated)?;
        }

        Ok(())
    }

    async fn run_categories_stage(&self) -> Result<()> {
        // Materialize the static taxonomy
        let mut name_to_id: HashMap<&'static str, u32> = HashMap::new();
        let mut assigned: HashSet<u32> =
            self.db.scan_categories(usize::MAX >> 1)?.iter().map(|c| c.id).collect();
        let aliases = self.db.load_id_aliases()?;

        for rule in taxonomy::all_rules() {
            let id = match self.db.get_category_by_name(rule.name)? {
                Some(existing) => existing.id,
                None => match aliases.get(rule.name) {
                    Some(id) => *id,
                    None => {
                        let id = generate_stable_id(rule.name, &assigned);
                        if id != hash_to_id(rule.name) {
                            self.db.save_id_alias(rule.name, id)?;
                        }
                        id
                    }
                },
            };
            assigned.insert(id);
            name_to_id.insert(rule.name, id);
        }

        for rule in taxonomy::all_rules() {
            let id = name_to_id[rule.name];
            let vector = self
                .embedder
                .embed(&format!("{}\n{}", rule.name, rule.description))
                .await?;
            self.db.upsert_category(&crate::db::Category {
                id,
                category: rule.name.to_string(),
                description: rule.description.to_string(),
                parent_category_id: rule.parent.map(|p| name_to_id[p]),
                aliases: rule.aliases.iter().map(|a| a.to_string()).collect(),
                related_categories: vec![],
                document_count: 0,
                chunk_count: 0,
                concept_count: 0,
                vector,
            })?;
        }

        // Derive category_ids per document from its concepts
        let concepts = self.db.scan_concepts(usize::MAX >> 1)?;
        for entry in self.db.scan_catalog(usize::MAX >> 1)? {
            let names: Vec<String> = concepts
                .iter()
                .filter(|c| c.catalog_ids.contains(&entry.id))
                .map(|c| c.concept.clone())
                .collect();
            let mut category_ids: Vec<u32> = taxonomy::derive_categories(&names)
                .iter()
                .map(|rule| name_to_id[rule.name])
                .collect();
            category_ids.sort_unstable();
            self.db.set_catalog_categories(entry.id, &category_ids)?;
            self.db.set_catalog_complete(entry.id, true)?;
        }

        // Counts are recomputed wholesale, never incrementally
        for rule in taxonomy::all_rules() {
            let id = name_to_id[rule.name];
            let documents = self.db.find_catalog_by_category(id)?;
            let mut chunk_count = 0u32;
            for document in &documents {
                chunk_count += self.db.chunks_for_catalog(document.id)?.len() as u32;
            }
            let concept_count = concepts
                .iter()
                .filter(|c| {
                    taxonomy::derive_categories(std::slice::from_ref(&c.concept))
                        .iter()
                        .any(|r| r.name == rule.name)
                })
                .count() as u32;
            self.db
                .set_category_counts(id, documents.len() as u32, chunk_count, concept_count)?;
        }

        Ok(())
    }
}

enum IngestOutcome {
    Skipped { hash: String },
    Ingested { hash: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_library(dir: &Path) {
        std::fs::create_dir_all(dir.join("books")).unwrap();
        std::fs::write(
            dir.join("books/gateways.md"),
            "# API Gateway Patterns\n\nThe API Gateway routes requests to services. \
             An api gateway terminates TLS. The gateway applies rate limiting to \
             every request. Rate limiting protects upstream services.",
        )
        .unwrap();
        std::fs::write(
            dir.join("books/consensus.md"),
            "# Consensus Protocols\n\nDistributed consensus lets replicas agree. \
             Consensus requires a quorum of replicas. Replication copies data \
             between nodes, and replication needs consensus to stay consistent.",
        )
        .unwrap();
    }

    struct Env {
        _tmp: TempDir,
        db: Database,
        embedder: CachedEmbedder,
        db_dir: PathBuf,
        files_dir: PathBuf,
    }

    fn env() -> Env {
        let tmp = TempDir::new().unwrap();
        let db_dir = tmp.path().join("db");
        let files_dir = tmp.path().join("library");
        std::fs::create_dir_all(&db_dir).unwrap();
        write_library(&files_dir);

        let db = Database::open(db_dir.join("conceptrag.sqlite")).unwrap();
        db.initialize().unwrap();
        Env {
            _tmp: tmp,
            db,
            embedder: CachedEmbedder::new(
                Arc::new(HashEmbedder::new()),
                256,
                Duration::from_secs(3600),
            ),
            db_dir,
            files_dir,
        }
    }

    fn seeder<'a>(
        env: &'a Env,
        extractor: &'a HeuristicExtractor,
        loader: &'a TextLoader,
    ) -> Seeder<'a> {
        Seeder::new(
            &env.db,
            &env.embedder,
            extractor,
            loader,
            &env.db_dir,
            &env.files_dir,
        )
    }

    #[tokio::test]
    async fn test_full_seed_populates_all_tables() {
        let env = env();
        let extractor = HeuristicExtractor::new();
        let loader = TextLoader;
        let report = seeder(&env, &extractor, &loader)
            .run(SeedOptions::default())
            .await
            .unwrap();

        assert_eq!(report.documents, 2);
        assert!(report.chunks >= 2);
        assert!(report.concepts > 0);
        assert!(report.categories > 0);
        assert_eq!(report.failed, 0);

        // Catalog ids are pure functions of the source path
        let entry = env
            .db
            .get_catalog_by_source("books/gateways.md")
            .unwrap()
            .unwrap();
        assert_eq!(entry.id, hash_to_id("books/gateways.md"));
        assert!(entry.complete);
        assert!(summary_is_valid(&entry.summary));
        assert!(!entry.category_ids.is_empty());

        // The gateway document was tagged with the gateway concept
        let concept = env.db.get_concept_by_name("api gateway").unwrap().unwrap();
        assert!(concept.catalog_ids.contains(&entry.id));
        let tagged = env.db.chunk_ids_for_concept(concept.id).unwrap();
        assert!(!tagged.is_empty());

        // Densities are within [0, 1]
        for chunk in env.db.scan_chunks(1000).unwrap() {
            if let Some(density) = chunk.concept_density {
                assert!((0.0..=1.0).contains(&density));
            }
        }
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let env = env();
        let extractor = HeuristicExtractor::new();
        let loader = TextLoader;
        seeder(&env, &extractor, &loader)
            .run(SeedOptions::default())
            .await
            .unwrap();

        let checkpoint_before = std::fs::read_to_string(
            env.db_dir.join(".seeding-checkpoint.json"),
        )
        .unwrap();
        let concepts_before = env.db.count_concepts().unwrap();

        let report = seeder(&env, &extractor, &loader)
            .run(SeedOptions::default())
            .await
            .unwrap();
        assert_eq!(report.skipped, 2);

        let checkpoint_after = std::fs::read_to_string(
            env.db_dir.join(".seeding-checkpoint.json"),
        )
        .unwrap();
        let before: Checkpoint = serde_json::from_str(&checkpoint_before).unwrap();
        let after: Checkpoint = serde_json::from_str(&checkpoint_after).unwrap();
        assert_eq!(before.total_processed, after.total_processed);
        assert_eq!(before.stage, after.stage);
        assert_eq!(env.db.count_concepts().unwrap(), concepts_before);
    }

    #[tokio::test]
    async fn test_rebuild_assigns_identical_ids() {
        let env = env();
        let extractor = HeuristicExtractor::new();
        let loader = TextLoader;
        seeder(&env, &extractor, &loader)
            .run(SeedOptions::default())
            .await
            .unwrap();

        let ids_first: Vec<(String, u32)> = env
            .db
            .scan_concepts(1000)
            .unwrap()
            .into_iter()
            .map(|c| (c.concept, c.id))
            .collect();

        // Force a full rebuild
        seeder(&env, &extractor, &loader)
            .run(SeedOptions { force: true })
            .await
            .unwrap();

        let ids_second: Vec<(String, u32)> = env
            .db
            .scan_concepts(1000)
            .unwrap()
            .into_iter()
            .map(|c| (c.concept, c.id))
            .collect();
        assert_eq!(ids_first, ids_second);
    }

    #[tokio::test]
    async fn test_changed_document_reingested() {
        let env = env();
        let extractor = HeuristicExtractor::new();
        let loader = TextLoader;
        seeder(&env, &extractor, &loader)
            .run(SeedOptions::default())
            .await
            .unwrap();

        let before = env
            .db
            .get_catalog_by_source("books/gateways.md")
            .unwrap()
            .unwrap();

        std::fs::write(
            env.files_dir.join("books/gateways.md"),
            "# API Gateway Patterns\n\nCompletely rewritten gateway content about \
             service meshes. The service mesh moves routing into sidecars.",
        )
        .unwrap();

        seeder(&env, &extractor, &loader)
            .run(SeedOptions::default())
            .await
            .unwrap();

        let after = env
            .db
            .get_catalog_by_source("books/gateways.md")
            .unwrap()
            .unwrap();
        // Same stable id, new content hash
        assert_eq!(before.id, after.id);
        assert_ne!(before.hash, after.hash);
    }

    #[test]
    fn test_title_and_doc_type_derivation() {
        assert_eq!(
            title_from("# The Title\nbody", Path::new("books/x.md")),
            "The Title"
        );
        assert_eq!(
            title_from("\n\nplain first line\nrest", Path::new("a.md")),
            "plain first line"
        );
        assert_eq!(title_from("", Path::new("books/some-book.md")), "some book");
        assert_eq!(doc_type_from("books/a.md"), DocType::Book);
        assert_eq!(doc_type_from("papers/b.md"), DocType::Paper);
        assert_eq!(doc_type_from("misc/c.md"), DocType::Unknown);
    }
}
