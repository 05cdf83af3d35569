//! Query-time retrieval: embed, search, score, log.
//!
//! The [`Retriever`] owns its collaborators through constructor injection:
//! an [`Embedder`] for the query vector, a [`VectorIndex`] for the top-k
//! search, and a [`RetrievalSink`] for the audit trail. It never re-sorts
//! what the index returns; the index is the authority on rank.
//!
//! # Steps
//!
//! 1. `embed_one(query)`, a single attempt.
//! 2. `query(vector, top_k, search_breadth)` against the index.
//! 3. Map each hit to a [`RetrievedResult`]: missing metadata becomes empty,
//!    similarity is clamped to `[0, 1]` and rounded to 4 decimals.
//! 4. Record a [`RetrievalLogEntry`]; sink failures never surface here.
//! 5. Return the results in index order.

use std::sync::Arc;

use chrono::Local;

use crate::embedding::Embedder;
use crate::index::{IndexError, VectorIndex};
use crate::log::{RetrievalLogEntry, RetrievalSink};
use crate::models::{IndexHit, RetrievedResult};

/// HNSW exploration factor used for every query.
pub const DEFAULT_SEARCH_BREADTH: usize = 128;

/// Default number of passages per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieverParams {
    pub default_top_k: usize,
    pub search_breadth: usize,
}

impl Default for RetrieverParams {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            search_breadth: DEFAULT_SEARCH_BREADTH,
        }
    }
}

/// Why a retrieval failed. Distinct from "nothing found", which is `Ok(vec![])`.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("embedding provider failed: {0}")]
    Embedding(#[source] anyhow::Error),
    #[error("vector index failed: {0}")]
    Index(#[from] IndexError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },
}

/// Orchestrates one query against the embedder and the index.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    sink: Arc<dyn RetrievalSink>,
    params: RetrieverParams,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        sink: Arc<dyn RetrievalSink>,
        params: RetrieverParams,
    ) -> Self {
        Self {
            embedder,
            index,
            sink,
            params,
        }
    }

    pub fn params(&self) -> &RetrieverParams {
        &self.params
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Retrieve with the configured default `top_k`.
    pub async fn retrieve_default(
        &self,
        query: &str,
    ) -> Result<Vec<RetrievedResult>, RetrievalError> {
        self.retrieve(query, self.params.default_top_k).await
    }

    /// Retrieve up to `top_k` passages for `query`, most similar first.
    ///
    /// # Errors
    ///
    /// Embedding or index failures are returned unchanged and not retried.
    /// A query vector whose length differs from the index dimension is a
    /// [`RetrievalError::Config`].
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedResult>, RetrievalError> {
        if top_k == 0 {
            self.log(query, &[]);
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed_one(query)
            .await
            .map_err(RetrievalError::Embedding)?;

        if let Some(dims) = self.index.dims() {
            if vector.len() != dims {
                return Err(RetrievalError::Config(format!(
                    "embedder '{}' produced {} dimensions but the index expects {}",
                    self.embedder.model_name(),
                    vector.len(),
                    dims
                )));
            }
        }

        let hits = self
            .index
            .query(&vector, top_k, self.params.search_breadth)
            .await?;

        let results: Vec<RetrievedResult> = hits.into_iter().map(result_from_hit).collect();

        tracing::debug!(
            query = %truncate_for_log(query),
            results = results.len(),
            "retrieved passages"
        );
        self.log(query, &results);

        Ok(results)
    }

    fn log(&self, query: &str, results: &[RetrievedResult]) {
        self.sink
            .record(&RetrievalLogEntry::new(query, results, Local::now()));
    }
}

/// Convert one raw index hit into a scored, attributed result.
pub fn result_from_hit(hit: IndexHit) -> RetrievedResult {
    let meta = hit.meta.unwrap_or_default();
    RetrievedResult {
        id: hit.id,
        text: meta.text.unwrap_or_default(),
        source: meta.source.unwrap_or_default(),
        page: meta.page.unwrap_or(0),
        similarity: normalize_similarity(hit.similarity),
    }
}

/// Clamp to `[0, 1]` and round to 4 decimal places. Non-finite scores are 0.
pub fn normalize_similarity(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    (raw.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
}

fn truncate_for_log(query: &str) -> String {
    query.chars().take(50).collect()
}
