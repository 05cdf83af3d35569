//! Ingestion pipeline orchestration.
//!
//! Coordinates the write path: extraction → chunking → embedding → index
//! upsert. Chunk ids are deterministic, so re-ingesting the same documents
//! replaces vectors instead of duplicating them.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use medassist_core::chunk::chunk_pages;
use medassist_core::embedding::Embedder;
use medassist_core::index::{IndexStatus, VectorIndex};
use medassist_core::models::{IndexRecord, Page};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::extract::{extract_dir, extract_file};
use crate::sqlite_index::create_index;

/// Tag written into every record's filter.
pub const DOC_TYPE: &str = "medical";

/// Counts reported at the end of an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub pages: usize,
    pub chunks: usize,
    pub vectors_upserted: usize,
    pub index_status: IndexStatus,
}

/// Gather pages from `--file`, `--dir`, or the configured ingest directories.
pub fn collect_pages(
    config: &Config,
    file: Option<&PathBuf>,
    dir: Option<&PathBuf>,
) -> Result<Vec<Page>> {
    let pages = if let Some(file) = file {
        extract_file(file).with_context(|| format!("Failed to extract {}", file.display()))?
    } else if let Some(dir) = dir {
        extract_dir(dir)
    } else {
        config
            .ingest
            .dirs
            .iter()
            .flat_map(|d| extract_dir(d))
            .collect()
    };

    if pages.is_empty() {
        bail!("No documents found to ingest");
    }
    Ok(pages)
}

/// Chunk, embed and upsert `pages` into `index`.
pub async fn ingest_pages(
    config: &Config,
    pages: &[Page],
    embedder: &Arc<dyn Embedder>,
    index: &Arc<dyn VectorIndex>,
) -> Result<IngestSummary> {
    let params = config.chunking.params();
    params.validate()?;

    let chunks = chunk_pages(pages, &params);
    if chunks.is_empty() {
        bail!("Documents produced no chunks (all pages blank?)");
    }

    let spec = config.index.spec();
    let index_status = index
        .ensure_index(&spec)
        .await
        .with_context(|| format!("Failed to prepare index '{}'", spec.name))?;
    if index_status == IndexStatus::Created {
        tracing::info!(index = %spec.name, dims = spec.dims, "index created");
    }

    let mut vectors = Vec::with_capacity(chunks.len());
    let batch_size = config.embedding.batch_size.max(1);
    for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embedded = embedder
            .embed_many(&texts)
            .await
            .with_context(|| format!("Embedding batch {} failed", batch_no + 1))?;
        if embedded.len() != texts.len() {
            bail!(
                "Embedder returned {} vectors for {} chunks",
                embedded.len(),
                texts.len()
            );
        }
        vectors.extend(embedded);
        tracing::info!(embedded = vectors.len(), total = chunks.len(), "embedding chunks");
    }

    let records: Vec<IndexRecord> = chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexRecord::from_chunk(chunk, vector, DOC_TYPE))
        .collect();

    let mut upserted = 0;
    for batch in records.chunks(config.index.upsert_batch_size.max(1)) {
        index
            .upsert(batch)
            .await
            .with_context(|| format!("Upsert into '{}' failed", spec.name))?;
        upserted += batch.len();
        tracing::info!(upserted, total = records.len(), "upserting vectors");
    }

    Ok(IngestSummary {
        pages: pages.len(),
        chunks: chunks.len(),
        vectors_upserted: upserted,
        index_status,
    })
}

/// `medassist ingest`: extract, build the configured embedder and index,
/// ingest, and print a summary.
pub async fn run_ingest(
    config: &Config,
    file: Option<PathBuf>,
    dir: Option<PathBuf>,
) -> Result<IngestSummary> {
    let pages = collect_pages(config, file.as_ref(), dir.as_ref())?;
    let embedder = create_embedder(&config.embedding)?;
    let index = create_index(config).await?;
    let summary = ingest_pages(config, &pages, &embedder, &index).await?;
    print_summary(config, &summary);
    Ok(summary)
}

pub fn print_summary(config: &Config, summary: &IngestSummary) {
    println!("ingest {}", config.index.name);
    println!("  pages extracted: {}", summary.pages);
    println!("  chunks created: {}", summary.chunks);
    println!("  vectors upserted: {}", summary.vectors_upserted);
    println!(
        "  index: {}",
        match summary.index_status {
            IndexStatus::Created => "created",
            IndexStatus::Exists => "existing",
        }
    );
}
