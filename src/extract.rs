//! Page extraction from source documents.
//!
//! PDFs yield one [`Page`] per physical page with text; plain-text files are
//! cut into page-like segments of roughly [`TXT_SEGMENT_CHARS`] characters on
//! paragraph boundaries. The source of every page is the file name.
//!
//! Extraction never panics: a PDF that makes the parser panic is reported
//! as [`ExtractError::Pdf`] and the directory walk skips it.

use std::path::{Path, PathBuf};

use medassist_core::models::Page;
use walkdir::WalkDir;

/// Target size of a plain-text segment.
pub const TXT_SEGMENT_CHARS: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed for {path}: {message}")]
    Pdf { path: PathBuf, message: String },
    #[error("unsupported file type: {0}")]
    Unsupported(PathBuf),
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Extract non-empty pages from a PDF, numbered by physical page (1-based).
pub fn extract_pdf(path: &Path) -> Result<Vec<Page>, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let pdf_err = |message: String| ExtractError::Pdf {
        path: path.to_path_buf(),
        message,
    };

    let texts = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    }))
    .map_err(|_| pdf_err("parser panicked".to_string()))?
    .map_err(|e| pdf_err(e.to_string()))?;

    let source = source_name(path);
    let pages: Vec<Page> = texts
        .iter()
        .enumerate()
        .filter_map(|(i, text)| {
            let text = text.trim();
            (!text.is_empty()).then(|| Page::new(source.clone(), i as u32 + 1, text))
        })
        .collect();

    tracing::info!(source = %source, pages = pages.len(), "extracted PDF pages");
    Ok(pages)
}

/// Extract a UTF-8 text file as paragraph-aligned segments.
pub fn extract_txt(path: &Path) -> Result<Vec<Page>, ExtractError> {
    let content = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let source = source_name(path);
    let pages = segment_text(&source, &content);
    tracing::info!(source = %source, segments = pages.len(), "extracted text segments");
    Ok(pages)
}

/// Group `"\n\n"`-separated paragraphs into segments of about
/// [`TXT_SEGMENT_CHARS`] characters. A single paragraph longer than that
/// becomes its own segment.
pub fn segment_text(source: &str, content: &str) -> Vec<Page> {
    let mut pages = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for para in content.split("\n\n") {
        let para_chars = para.chars().count();
        if current_chars + para_chars > TXT_SEGMENT_CHARS && !current.is_empty() {
            pages.push(Page::new(source, pages.len() as u32 + 1, current.trim()));
            current = para.to_string();
            current_chars = para_chars;
        } else if current.is_empty() {
            current.push_str(para);
            current_chars = para_chars;
        } else {
            current.push_str("\n\n");
            current.push_str(para);
            current_chars += 2 + para_chars;
        }
    }

    if !current.trim().is_empty() {
        pages.push(Page::new(source, pages.len() as u32 + 1, current.trim()));
    }

    pages
}

/// Extract one file, dispatching on its extension (`.pdf` or `.txt`).
pub fn extract_file(path: &Path) -> Result<Vec<Page>, ExtractError> {
    match extension(path).as_deref() {
        Some("pdf") => extract_pdf(path),
        Some("txt") => extract_txt(path),
        _ => Err(ExtractError::Unsupported(path.to_path_buf())),
    }
}

/// Extract every `.pdf` and `.txt` file directly inside `dir`, in file-name
/// order. A missing directory yields no pages. Files that fail to extract
/// are logged and skipped.
pub fn extract_dir(dir: &Path) -> Vec<Page> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "directory not found");
        return Vec::new();
    }

    let mut pages = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if !matches!(extension(path).as_deref(), Some("pdf") | Some("txt")) {
            continue;
        }
        match extract_file(path) {
            Ok(mut extracted) => pages.append(&mut extracted),
            Err(e) => tracing::warn!(error = %e, "skipping file"),
        }
    }

    tracing::info!(dir = %dir.display(), pages = pages.len(), "extracted directory");
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_short_text_single_segment() {
        let pages = segment_text("notes.txt", "First paragraph.\n\nSecond paragraph.\n");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page, 1);
        assert_eq!(pages[0].source, "notes.txt");
        assert_eq!(pages[0].text, "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn test_segments_break_on_paragraphs() {
        let para = "a".repeat(400);
        let content = vec![para.as_str(); 5].join("\n\n");
        let pages = segment_text("long.txt", &content);
        // 400 + 2 + 400 fits; the third paragraph would exceed 1000.
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].text.chars().count(), 802);
        assert_eq!(pages[2].text.chars().count(), 400);
        let numbers: Vec<u32> = pages.iter().map(|p| p.page).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_oversized_paragraph_kept_whole() {
        let big = "b".repeat(2500);
        let pages = segment_text("big.txt", &format!("intro\n\n{}\n\noutro", big));
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].text, big);
    }

    #[test]
    fn test_blank_text_no_segments() {
        assert!(segment_text("empty.txt", "").is_empty());
        assert!(segment_text("empty.txt", "\n\n  \n\n").is_empty());
    }

    #[test]
    fn test_invalid_pdf_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.pdf");
        fs::write(&path, b"not a valid pdf").unwrap();
        assert!(matches!(extract_pdf(&path), Err(ExtractError::Pdf { .. })));
    }

    #[test]
    fn test_extract_file_dispatch() {
        let tmp = TempDir::new().unwrap();
        let txt = tmp.path().join("Guide.TXT");
        fs::write(&txt, "Ferritin reflects iron stores.").unwrap();
        let pages = extract_file(&txt).unwrap();
        assert_eq!(pages[0].source, "Guide.TXT");

        let md = tmp.path().join("readme.md");
        fs::write(&md, "# hi").unwrap();
        assert!(matches!(extract_file(&md), Err(ExtractError::Unsupported(_))));

        assert!(matches!(
            extract_file(&tmp.path().join("missing.txt")),
            Err(ExtractError::Io { .. })
        ));
    }

    #[test]
    fn test_extract_dir_sorted_and_skips() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "Beta text.").unwrap();
        fs::write(tmp.path().join("a.txt"), "Alpha text.").unwrap();
        fs::write(tmp.path().join("c.md"), "ignored").unwrap();
        fs::write(tmp.path().join("d.pdf"), b"broken").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/e.txt"), "nested, not walked").unwrap();

        let pages = extract_dir(tmp.path());
        let sources: Vec<&str> = pages.iter().map(|p| p.source.as_str()).collect();
        assert_eq!(sources, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_extract_dir_missing() {
        assert!(extract_dir(Path::new("/nonexistent/medassist/docs")).is_empty());
    }
}
