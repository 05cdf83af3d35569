//! In-memory [`VectorIndex`] implementation for testing and small corpora.
//!
//! Uses a `HashMap` behind `std::sync::RwLock` for thread safety.
//! Search is brute-force cosine similarity over all stored vectors, which
//! is exact and therefore ignores the search breadth.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{IndexHit, IndexRecord};

use super::{
    IndexError, IndexErrorKind, IndexResult, IndexSpec, IndexStatus, VectorIndex,
};

struct Inner {
    spec: Option<IndexSpec>,
    records: HashMap<String, IndexRecord>,
    /// Insertion order, so equal scores sort deterministically.
    order: Vec<String>,
}

/// In-memory vector index.
pub struct InMemoryIndex {
    inner: RwLock<Inner>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                spec: None,
                records: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    fn poisoned() -> IndexError {
        IndexError::new(IndexErrorKind::Backend, "in-memory index lock poisoned")
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ensure_index(&self, spec: &IndexSpec) -> IndexResult<IndexStatus> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        match &inner.spec {
            Some(existing) if existing.dims != spec.dims => {
                Err(IndexError::dimension_mismatch(existing.dims, spec.dims))
            }
            Some(_) => Ok(IndexStatus::Exists),
            None => {
                inner.spec = Some(spec.clone());
                Ok(IndexStatus::Created)
            }
        }
    }

    async fn upsert(&self, records: &[IndexRecord]) -> IndexResult<()> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        let dims = match &inner.spec {
            Some(spec) => spec.dims,
            None => return Err(IndexError::not_found("in-memory")),
        };
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dims) {
            return Err(IndexError::dimension_mismatch(dims, bad.vector.len()));
        }
        for record in records {
            if !inner.records.contains_key(&record.id) {
                inner.order.push(record.id.clone());
            }
            inner.records.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        _search_breadth: usize,
    ) -> IndexResult<Vec<IndexHit>> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        let dims = match &inner.spec {
            Some(spec) => spec.dims,
            None => return Err(IndexError::not_found("in-memory")),
        };
        if vector.len() != dims {
            return Err(IndexError::dimension_mismatch(dims, vector.len()));
        }

        let mut hits: Vec<IndexHit> = inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .map(|r| IndexHit {
                id: r.id.clone(),
                similarity: cosine_similarity(vector, &r.vector) as f64,
                meta: Some(r.meta.clone().into()),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self) -> IndexResult<usize> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(inner.records.len())
    }

    fn dims(&self) -> Option<usize> {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.spec.as_ref().map(|s| s.dims))
    }
}
