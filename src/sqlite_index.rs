//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Each named index is a row in `indexes`; its vectors live in `vectors`
//! as little-endian `f32` BLOBs next to their attribution metadata. Search
//! is exact brute-force cosine, so `search_breadth` is accepted and
//! ignored. The recorded precision is informational: vectors are always
//! stored at full `f32` width.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::{Arc, RwLock};

use medassist_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use medassist_core::index::memory::InMemoryIndex;
use medassist_core::index::{
    IndexError, IndexErrorKind, IndexResult, IndexSpec, IndexStatus, VectorIndex,
};
use medassist_core::models::{HitMeta, IndexHit, IndexRecord};

use crate::config::Config;
use crate::db;

/// One named vector index inside a SQLite database.
pub struct SqliteIndex {
    pool: SqlitePool,
    name: String,
    /// Cached dimension, filled once the index is known to exist.
    dims: RwLock<Option<usize>>,
}

impl SqliteIndex {
    /// Open the database at `path`, run migrations, and bind to index `name`.
    pub async fn open(path: &Path, name: &str) -> Result<Self> {
        let pool = db::connect(path).await?;
        db::run_migrations(&pool).await?;
        Self::with_pool(pool, name).await
    }

    /// Bind to index `name` over an already-migrated pool.
    pub async fn with_pool(pool: SqlitePool, name: &str) -> Result<Self> {
        let index = Self {
            pool,
            name: name.to_string(),
            dims: RwLock::new(None),
        };
        index.current_dims().await?;
        Ok(index)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn cache_dims(&self, dims: usize) {
        if let Ok(mut cached) = self.dims.write() {
            *cached = Some(dims);
        }
    }

    async fn stored_dims(&self) -> IndexResult<Option<usize>> {
        let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM indexes WHERE name = ?")
            .bind(&self.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(dims.map(|d| d as usize))
    }

    /// Dimension of the index, re-reading the database when not yet cached.
    async fn current_dims(&self) -> IndexResult<Option<usize>> {
        if let Some(dims) = self.dims() {
            return Ok(Some(dims));
        }
        let dims = self.stored_dims().await?;
        if let Some(d) = dims {
            self.cache_dims(d);
        }
        Ok(dims)
    }

    async fn require_dims(&self) -> IndexResult<usize> {
        self.current_dims()
            .await?
            .ok_or_else(|| IndexError::not_found(&self.name))
    }
}

fn map_sqlx(err: sqlx::Error) -> IndexError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            IndexError::new(IndexErrorKind::Unavailable, err.to_string())
        }
        other => IndexError::backend(other),
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn ensure_index(&self, spec: &IndexSpec) -> IndexResult<IndexStatus> {
        if spec.name != self.name {
            return Err(IndexError::new(
                IndexErrorKind::InvalidRequest,
                format!(
                    "index handle is bound to '{}', not '{}'",
                    self.name, spec.name
                ),
            ));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO indexes (name, dims, space, precision, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(&spec.name)
        .bind(spec.dims as i64)
        .bind(spec.space.as_str())
        .bind(spec.precision.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?
        .rows_affected();

        if inserted == 1 {
            tracing::info!(index = %spec.name, dims = spec.dims, "created vector index");
            self.cache_dims(spec.dims);
            return Ok(IndexStatus::Created);
        }

        // Someone else created it first, possibly another process.
        let existing = self
            .stored_dims()
            .await?
            .ok_or_else(|| IndexError::not_found(&spec.name))?;
        if existing != spec.dims {
            return Err(IndexError::dimension_mismatch(existing, spec.dims));
        }
        self.cache_dims(existing);
        Ok(IndexStatus::Exists)
    }

    async fn upsert(&self, records: &[IndexRecord]) -> IndexResult<()> {
        let dims = self.require_dims().await?;
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dims) {
            return Err(IndexError::dimension_mismatch(dims, bad.vector.len()));
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        for record in records {
            let filter_json = serde_json::Value::Object(record.filter.clone()).to_string();
            sqlx::query(
                r#"
                INSERT INTO vectors (index_name, id, embedding, text, source, page, filter_json)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(index_name, id) DO UPDATE SET
                    embedding = excluded.embedding,
                    text = excluded.text,
                    source = excluded.source,
                    page = excluded.page,
                    filter_json = excluded.filter_json
                "#,
            )
            .bind(&self.name)
            .bind(&record.id)
            .bind(vec_to_blob(&record.vector))
            .bind(&record.meta.text)
            .bind(&record.meta.source)
            .bind(record.meta.page as i64)
            .bind(filter_json)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }
        tx.commit().await.map_err(map_sqlx)?;

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        _search_breadth: usize,
    ) -> IndexResult<Vec<IndexHit>> {
        let dims = self.require_dims().await?;
        if vector.len() != dims {
            return Err(IndexError::dimension_mismatch(dims, vector.len()));
        }

        let rows = sqlx::query(
            "SELECT id, embedding, text, source, page FROM vectors WHERE index_name = ? ORDER BY rowid",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut hits: Vec<IndexHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let page: i64 = row.get("page");
                IndexHit {
                    id: row.get("id"),
                    similarity: cosine_similarity(vector, &blob_to_vec(&blob)) as f64,
                    meta: Some(HitMeta {
                        text: row.get("text"),
                        source: row.get("source"),
                        page: u32::try_from(page).ok(),
                    }),
                }
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
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors WHERE index_name = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(n as usize)
    }

    fn dims(&self) -> Option<usize> {
        self.dims.read().ok().and_then(|d| *d)
    }
}

/// Create the [`VectorIndex`] selected by `[index] backend`.
pub async fn create_index(config: &Config) -> Result<Arc<dyn VectorIndex>> {
    match config.index.backend.as_str() {
        "sqlite" => Ok(Arc::new(
            SqliteIndex::open(&config.index.path, &config.index.name).await?,
        )),
        "memory" => Ok(Arc::new(InMemoryIndex::new())),
        other => bail!("Unknown index backend: {}", other),
    }
}
