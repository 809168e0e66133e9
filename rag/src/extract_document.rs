use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{RagError, Result};

const TEXT_EXTS: &[&str] = &["txt", "md", "markdown", "text"];

/// Plain text pulled out of an uploaded file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub name: String,
    pub text: String,
    pub page_count: usize,
}

impl ExtractedDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>, page_count: usize) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            page_count,
        }
    }
}

/// Reads a PDF or plain-text file. Blocking; run it off the async runtime.
///
/// PDFs that cannot be parsed come back with empty text so the caller
/// reports them the same way as image-only scans.
pub fn extract_document(path: &Path) -> Result<ExtractedDocument> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if ext == "pdf" {
        let bytes = fs::read(path)
            .map_err(|e| RagError::Extraction(format!("failed to read {}: {}", path.display(), e)))?;
        let (text, page_count) = pdf_text(&bytes, &name);
        return Ok(ExtractedDocument::new(name, text, page_count));
    }

    if TEXT_EXTS.contains(&ext.as_str()) {
        let text = fs::read_to_string(path)
            .map_err(|e| RagError::Extraction(format!("failed to read {}: {}", path.display(), e)))?;
        return Ok(ExtractedDocument::new(name, text, 1));
    }

    Err(RagError::Extraction(format!(
        "unsupported file type '{}' (expected .pdf, .txt or .md)",
        path.display()
    )))
}

fn pdf_text(bytes: &[u8], name: &str) -> (String, usize) {
    // pdf-extract panics on some malformed inputs instead of returning Err.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => {
            let page_count = pages.len();
            let mut text = String::new();
            for page in pages {
                text.push_str(&page);
                text.push_str("\n\n");
            }
            (text, page_count)
        }
        Ok(Err(err)) => {
            warn!(document = name, error = %err, "pdf text extraction failed");
            (String::new(), 0)
        }
        Err(_) => {
            warn!(document = name, "pdf text extraction panicked");
            (String::new(), 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(file: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("astra-extract-{}-{}", std::process::id(), file))
    }

    #[test]
    fn reads_plain_text_as_single_page() {
        let path = temp_path("notes.txt");
        fs::write(&path, "Cells are the unit of life.").unwrap();
        let doc = extract_document(&path).expect("text file should extract");
        fs::remove_file(&path).ok();

        assert_eq!(doc.page_count, 1);
        assert_eq!(doc.text, "Cells are the unit of life.");
        assert!(doc.name.ends_with("notes.txt"));
    }

    #[test]
    fn garbage_pdf_becomes_empty_text() {
        let path = temp_path("broken.pdf");
        fs::write(&path, b"definitely not a pdf").unwrap();
        let doc = extract_document(&path).expect("unparsable pdf is not an error");
        fs::remove_file(&path).ok();

        assert!(doc.text.trim().is_empty());
    }

    #[test]
    fn missing_and_unsupported_files_fail() {
        let err = extract_document(&temp_path("missing.txt")).unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));

        let err = extract_document(Path::new("slides.pptx")).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }
}
