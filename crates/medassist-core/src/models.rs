//! Core data models used throughout MedAssist.
//!
//! These types represent the pages, chunks, index records, and retrieval
//! results that flow through the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

/// One logically contiguous unit of extracted source text.
///
/// Produced by page extraction and consumed only by the chunker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub text: String,
    /// 1-based sequence number within the source.
    pub page: u32,
    /// Originating document (usually the file name).
    pub source: String,
}

impl Page {
    pub fn new(source: impl Into<String>, page: u32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page,
            source: source.into(),
        }
    }
}

/// A bounded span of page text destined for embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{source}_p{page}_c{local_index}`; stable across re-ingestion.
    pub id: String,
    pub text: String,
    pub page: u32,
    pub source: String,
    /// Position within one `chunk_pages` call. Ordering only, not identity.
    pub chunk_index: usize,
}

/// Attribution metadata stored next to every vector in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub text: String,
    pub source: String,
    pub page: u32,
}

impl From<&Chunk> for ChunkMeta {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            source: chunk.source.clone(),
            page: chunk.page,
        }
    }
}

/// A vector plus metadata, as written to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub meta: ChunkMeta,
    /// Filter tags (e.g. `doc_type = "medical"`).
    #[serde(default)]
    pub filter: serde_json::Map<String, serde_json::Value>,
}

impl IndexRecord {
    /// Build a record for `chunk`, tagged with `doc_type`.
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>, doc_type: &str) -> Self {
        let mut filter = serde_json::Map::new();
        filter.insert(
            "doc_type".to_string(),
            serde_json::Value::String(doc_type.to_string()),
        );
        Self {
            id: chunk.id.clone(),
            vector,
            meta: ChunkMeta::from(chunk),
            filter,
        }
    }
}

/// Metadata as returned by an index query. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitMeta {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl From<ChunkMeta> for HitMeta {
    fn from(meta: ChunkMeta) -> Self {
        Self {
            text: Some(meta.text),
            source: Some(meta.source),
            page: Some(meta.page),
        }
    }
}

/// One raw hit from [`VectorIndex::query`](crate::index::VectorIndex::query).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    /// Raw backend similarity (cosine, so nominally `[-1, 1]`).
    pub similarity: f64,
    #[serde(default)]
    pub meta: Option<HitMeta>,
}

/// A chunk enriched with its similarity to one query.
///
/// This is the shape handed to the generator and shown to users as a
/// citable source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedResult {
    pub id: String,
    pub text: String,
    pub source: String,
    /// `0` when the index returned no page number.
    pub page: u32,
    /// Confidence in `[0, 1]`, rounded to 4 decimal places.
    pub similarity: f64,
}
