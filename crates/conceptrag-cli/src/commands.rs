//! Command implementations

use crate::app::{
    CategoriesArgs, ChunksArgs, ConceptArgs, OutputFormat, SearchArgs, SeedArgs,
};
use anyhow::Result;
use conceptrag_core::tools::{self, ListSort};
use conceptrag_core::{Container, SeedOptions};

pub async fn seed(container: &mut Container, args: SeedArgs, format: OutputFormat) -> Result<()> {
    if let Some(files_dir) = args.files_dir {
        container.config.files_dir = files_dir;
    }
    let report = container.seed(SeedOptions { force: args.force }).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Cli => {
            println!("Processed: {}", report.processed);
            println!("Skipped:   {}", report.skipped);
            println!("Failed:    {}", report.failed);
            println!("Documents: {}", report.documents);
            println!("Chunks:    {}", report.chunks);
            println!("Concepts:  {}", report.concepts);
            println!("Categories: {}", report.categories);
        }
    }
    Ok(())
}

pub async fn search(container: &Container, args: SearchArgs, format: OutputFormat) -> Result<()> {
    let items =
        tools::catalog_search(container, &args.query, Some(args.limit), args.debug).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Cli => {
            for item in &items {
                println!("{:.3}  {}  ({})", item.score, item.title, item.source);
                if args.debug {
                    if let Some(debug) = &item.debug {
                        println!(
                            "       vector={:.3} bm25={:.3} title={:.3} wordnet={:.3}",
                            debug.vector, debug.bm25, debug.title, debug.wordnet
                        );
                    }
                }
            }
            if items.is_empty() {
                println!("no results");
            }
        }
    }
    Ok(())
}

pub async fn chunks(container: &Container, args: ChunksArgs, format: OutputFormat) -> Result<()> {
    let items = tools::chunks_search(
        container,
        &args.query,
        args.source.as_deref(),
        Some(args.limit),
    )
    .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Cli => {
            for item in &items {
                let preview: String = item.text.chars().take(120).collect();
                println!("{:.3}  [{}] {}", item.score, item.title, preview);
            }
            if items.is_empty() {
                println!("no results");
            }
        }
    }
    Ok(())
}

pub async fn concept(container: &Container, args: ConceptArgs, format: OutputFormat) -> Result<()> {
    if args.overview {
        let overview = tools::concept_hierarchy(container, &args.concept, 5, args.limit)?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&overview)?),
            OutputFormat::Cli => {
                println!("{} — {}", overview.concept, overview.summary);
                println!(
                    "{} chunks across {} sources",
                    overview.total_chunks,
                    overview.sources.len()
                );
                for source in &overview.sources {
                    println!("  {}", source.title);
                    for chunk in &source.chunks {
                        match chunk.page_number {
                            Some(page) => println!("    p.{}: {}", page, chunk.preview),
                            None => println!("    {}", chunk.preview),
                        }
                    }
                }
            }
        }
        return Ok(());
    }

    let response = tools::concept_search(container, &args.concept, Some(args.limit)).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Cli => {
            match response.concept_id {
                Some(id) => println!("concept id {}", id),
                None => println!("unknown concept"),
            }
            for chunk in &response.chunks {
                let preview: String = chunk.text.chars().take(120).collect();
                println!("{:.3}  {}", chunk.distance, preview);
            }
        }
    }
    Ok(())
}

pub fn categories(container: &Container, args: CategoriesArgs, format: OutputFormat) -> Result<()> {
    let listing = tools::list_categories(
        container,
        ListSort::Name,
        Some(args.limit),
        args.hierarchy,
        args.filter.as_deref(),
    )?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Cli => {
            for category in &listing.categories {
                let name = match &category.hierarchy {
                    Some(path) => path.join(" > "),
                    None => category.category.clone(),
                };
                println!(
                    "{}  ({} docs, {} chunks, {} concepts)",
                    name, category.document_count, category.chunk_count, category.concept_count
                );
            }
            println!("{} total", listing.total);
        }
    }
    Ok(())
}

pub fn status(container: &Container, format: OutputFormat) -> Result<()> {
    let report = tools::status(container)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Cli => {
            println!("Documents:  {}", report.documents);
            println!("Chunks:     {}", report.chunks);
            println!("Concepts:   {}", report.concepts);
            println!("Categories: {}", report.categories);
            println!("Visuals:    {}", report.visuals);
            println!(
                "Health:     {}",
                if report.healthy { "ok" } else { "degraded" }
            );
            for name in &report.open_circuits {
                println!("  open circuit: {}", name);
            }
            for name in &report.saturated_bulkheads {
                println!("  saturated bulkhead: {}", name);
            }
        }
    }
    Ok(())
}
