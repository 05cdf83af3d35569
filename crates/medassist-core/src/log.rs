//! Retrieval audit records.
//!
//! Every query produces one [`RetrievalLogEntry`], handed to a
//! [`RetrievalSink`]. Sinks are fire-and-forget: `record` returns nothing,
//! and an implementation that fails must swallow the failure itself.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::RetrievedResult;

/// Maximum characters of chunk text kept in a log preview.
pub const PREVIEW_CHARS: usize = 100;

/// One append-only audit record for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalLogEntry {
    /// RFC 3339 local time.
    pub timestamp: String,
    pub query: String,
    pub num_results: usize,
    pub results: Vec<LoggedResult>,
}

/// A truncated view of one [`RetrievedResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedResult {
    pub id: String,
    pub source: String,
    pub page: u32,
    pub similarity: f64,
    pub text_preview: String,
}

impl RetrievalLogEntry {
    pub fn new(query: &str, results: &[RetrievedResult], at: DateTime<Local>) -> Self {
        Self {
            timestamp: at.to_rfc3339(),
            query: query.to_string(),
            num_results: results.len(),
            results: results
                .iter()
                .map(|r| LoggedResult {
                    id: r.id.clone(),
                    source: r.source.clone(),
                    page: r.page,
                    similarity: r.similarity,
                    text_preview: preview(&r.text),
                })
                .collect(),
        }
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`, with `"..."` when cut.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let mut cut: String = text.chars().take(PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// Destination for retrieval audit records.
pub trait RetrievalSink: Send + Sync {
    /// Persist `entry`. Must not panic and must not block retrieval on failure.
    fn record(&self, entry: &RetrievalLogEntry);
}

/// Sink that discards everything.
pub struct NoopSink;

impl RetrievalSink for NoopSink {
    fn record(&self, _entry: &RetrievalLogEntry) {}
}
