//! Append-only JSONL audit trail of every retrieval.
//!
//! One line per query. Writes are serialized process-wide and each record
//! goes out in a single `write_all`, so concurrent queries never interleave
//! within a line. Any I/O or serialization failure is logged and dropped:
//! auditing never fails a query.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use medassist_core::log::{RetrievalLogEntry, RetrievalSink};

static WRITE_LOCK: Mutex<()> = Mutex::new(());

/// [`RetrievalSink`] appending JSON lines to a file.
pub struct JsonlRetrievalLog {
    path: PathBuf,
}

impl JsonlRetrievalLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &RetrievalLogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let _guard = WRITE_LOCK
            .lock()
            .map_err(|_| anyhow::anyhow!("retrieval log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl RetrievalSink for JsonlRetrievalLog {
    fn record(&self, entry: &RetrievalLogEntry) {
        if let Err(e) = self.append(entry) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write retrieval log entry");
        }
    }
}
