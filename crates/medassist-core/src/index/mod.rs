//! Vector index abstraction for MedAssist.
//!
//! The [`VectorIndex`] trait is the boundary to whatever stores vectors and
//! answers top-k similarity queries (SQLite, in-memory, a remote ANN
//! service). Retrieval and ingestion only ever talk to this trait.
//!
//! Errors carry an [`IndexErrorKind`] so callers can branch on *what* went
//! wrong without inspecting message text.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{IndexHit, IndexRecord};

/// Distance space of an index. Only cosine is used for text embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    Cosine,
}

impl SpaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceType::Cosine => "cosine",
        }
    }
}

/// Storage precision requested for vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    F32,
    F16,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::F32 => "f32",
            Precision::F16 => "f16",
        }
    }
}

/// Parameters for creating (or verifying) an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dims: usize,
    pub space: SpaceType,
    pub precision: Precision,
}

impl IndexSpec {
    pub fn cosine(name: impl Into<String>, dims: usize) -> Self {
        Self {
            name: name.into(),
            dims,
            space: SpaceType::Cosine,
            precision: Precision::F16,
        }
    }
}

/// Outcome of [`VectorIndex::ensure_index`] when it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// The index was already present with a compatible configuration.
    Exists,
    /// The index did not exist and has been created.
    Created,
}

/// What category of failure an index operation hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorKind {
    /// The named index does not exist.
    NotFound,
    /// A create raced with another creator.
    AlreadyExists,
    /// Vector or index dimensions disagree.
    DimensionMismatch,
    /// The backend could not be reached.
    Unavailable,
    /// The request itself was malformed.
    InvalidRequest,
    /// Any other backend failure.
    Backend,
}

/// Structured error returned by every [`VectorIndex`] operation.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct IndexError {
    pub kind: IndexErrorKind,
    pub message: String,
}

impl IndexError {
    pub fn new(kind: IndexErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(name: &str) -> Self {
        Self::new(IndexErrorKind::NotFound, format!("index '{}' not found", name))
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::new(
            IndexErrorKind::DimensionMismatch,
            format!("expected {} dimensions, got {}", expected, actual),
        )
    }

    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::new(IndexErrorKind::Backend, err.to_string())
    }
}

pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Abstract vector index.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ensure_index`](VectorIndex::ensure_index) | Idempotent create-or-verify |
/// | [`upsert`](VectorIndex::upsert) | Insert or replace records by ID |
/// | [`query`](VectorIndex::query) | Top-k similarity search |
/// | [`count`](VectorIndex::count) | Number of stored vectors |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the index if it is missing.
    ///
    /// Succeeds with [`IndexStatus::Exists`] when an index of the same name
    /// and dimension is already present. A dimension conflict is reported
    /// as [`IndexErrorKind::DimensionMismatch`].
    async fn ensure_index(&self, spec: &IndexSpec) -> IndexResult<IndexStatus>;

    /// Insert or replace records. A record with an existing ID replaces it.
    async fn upsert(&self, records: &[IndexRecord]) -> IndexResult<()>;

    /// Return up to `top_k` hits ordered by descending similarity.
    ///
    /// `search_breadth` is the accuracy/latency knob for approximate
    /// backends (HNSW `ef`). Exact backends may ignore it.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        search_breadth: usize,
    ) -> IndexResult<Vec<IndexHit>>;

    /// Number of stored vectors.
    async fn count(&self) -> IndexResult<usize>;

    /// Dimension of the index, once it exists.
    fn dims(&self) -> Option<usize>;
}
