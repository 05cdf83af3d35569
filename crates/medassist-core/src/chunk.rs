//! Sentence-aware sliding-window chunker.
//!
//! Splits page text into overlapping [`Chunk`]s of at most `chunk_size`
//! characters. Windows prefer to end on a sentence terminator (`". "`) or a
//! newline so that retrieved passages rarely stop mid-sentence.
//!
//! Lengths and offsets are counted in Unicode scalar values, so a window
//! never splits a multi-byte character.
//!
//! # Algorithm
//!
//! 1. If the text fits in one window, emit it whole.
//! 2. Otherwise place a window `[start, start + chunk_size)`.
//! 3. Unless the window reaches the end of the text, look backward from the
//!    window end for the last `". "` or `'\n'`. If that boundary lies
//!    strictly after `start + chunk_size × boundary_ratio`, end the window
//!    just after it.
//! 4. Emit the trimmed window (empty windows are dropped).
//! 5. Start the next window `overlap` characters before the previous end,
//!    and stop once the start reaches or passes the end of the text.
//!
//! # Example
//!
//! ```rust
//! use medassist_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("Iron deficiency is common.", 500, 50);
//! assert_eq!(chunks, vec!["Iron deficiency is common.".to_string()]);
//! ```

use anyhow::{bail, Result};

use crate::models::{Chunk, Page};

/// Default share of the window a sentence boundary must lie beyond.
pub const DEFAULT_BOUNDARY_RATIO: f64 = 0.5;

/// Chunking parameters, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkParams {
    /// Window width in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows.
    pub overlap: usize,
    /// A sentence boundary is only used when it lies after
    /// `start + chunk_size × boundary_ratio`.
    pub boundary_ratio: f64,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
            boundary_ratio: DEFAULT_BOUNDARY_RATIO,
        }
    }
}

impl ChunkParams {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            boundary_ratio: DEFAULT_BOUNDARY_RATIO,
        }
    }

    /// Reject parameter sets that cannot produce forward progress.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if self.overlap >= self.chunk_size {
            bail!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap,
                self.chunk_size
            );
        }
        if !(self.boundary_ratio > 0.0 && self.boundary_ratio < 1.0) {
            bail!("boundary_ratio must be in (0.0, 1.0)");
        }
        Ok(())
    }

    /// Offset from the window start that a boundary must exceed.
    fn boundary_floor(&self) -> usize {
        (self.chunk_size as f64 * self.boundary_ratio) as usize
    }
}

/// Split `text` into overlapping windows using the default boundary ratio.
///
/// See the [module documentation](self) for the algorithm.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    split_text(text, &ChunkParams::new(chunk_size, overlap))
}

/// Split `text` into overlapping, sentence-aware windows.
///
/// # Guarantees
///
/// - Every returned string is non-empty and at most `chunk_size` characters.
/// - Text no longer than `chunk_size` yields exactly one (trimmed) chunk,
///   or none if it is blank.
/// - Always terminates, even for `overlap >= chunk_size`.
pub fn split_text(text: &str, params: &ChunkParams) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let size = params.chunk_size.max(1);

    if len <= size {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![trimmed.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        // `end` may run past the text; only the slice is clamped.
        let mut end = start + size;

        if end < len {
            if let Some(boundary) = last_boundary(&chars, start, end) {
                if boundary > start + params.boundary_floor() {
                    end = boundary + 1;
                }
            }
        }

        let piece: String = chars[start..end.min(len)].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        let next = end.saturating_sub(params.overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

/// Index of the last `". "` or `'\n'` that lies entirely inside `[start, end)`.
fn last_boundary(chars: &[char], start: usize, end: usize) -> Option<usize> {
    let newline = (start..end).rev().find(|&i| chars[i] == '\n');
    let period = if end >= start + 2 {
        (start..end - 1)
            .rev()
            .find(|&i| chars[i] == '.' && chars[i + 1] == ' ')
    } else {
        None
    };
    newline.max(period)
}

/// Chunk every page, in page order, preserving attribution.
///
/// `chunk_index` increases monotonically across the whole call; the
/// per-page counter embedded in the ID restarts at zero for each page.
pub fn chunk_pages(pages: &[Page], params: &ChunkParams) -> Vec<Chunk> {
    let mut all_chunks = Vec::new();
    let mut chunk_index = 0usize;

    for page in pages {
        for (local, text) in split_text(&page.text, params).into_iter().enumerate() {
            all_chunks.push(Chunk {
                id: chunk_id(&page.source, page.page, local),
                text,
                page: page.page,
                source: page.source.clone(),
                chunk_index,
            });
            chunk_index += 1;
        }
    }

    tracing::info!(
        chunks = all_chunks.len(),
        pages = pages.len(),
        "chunked pages"
    );
    all_chunks
}

/// Deterministic chunk identifier: `{source}_p{page}_c{local_index}`.
pub fn chunk_id(source: &str, page: u32, local_index: usize) -> String {
    format!("{}_p{}_c{}", source, page, local_index)
}
