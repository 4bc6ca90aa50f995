use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::domain::Page;
use crate::error::{codes, AppError};

/// Extracts ordered page text from a document on disk.
pub trait DocumentLoader {
    fn load_pages(&self, path: &Path) -> Result<Vec<Page>, AppError>;
}

/// PDF text via the poppler `pdftotext` binary. Pages are separated by form feeds
/// in its output.
#[derive(Debug, Clone)]
pub struct PdftotextLoader {
    bin: String,
}

impl PdftotextLoader {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Default for PdftotextLoader {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

impl DocumentLoader for PdftotextLoader {
    fn load_pages(&self, path: &Path) -> Result<Vec<Page>, AppError> {
        let output = Command::new(&self.bin)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                AppError::new(
                    codes::INGEST_FAILED,
                    "Failed to run pdftotext (is poppler installed?)",
                )
                .with_details(format!("bin={}; path={}; err={}", self.bin, path.display(), e))
            })?;

        if !output.status.success() {
            return Err(AppError::new(codes::INGEST_FAILED, "pdftotext failed to parse document")
                .with_details(format!(
                    "path={}; status={}; stderr={}",
                    path.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let pages = split_form_feed_pages(&text);
        debug!(path = %path.display(), pages = pages.len(), "extracted pdf text");
        Ok(pages)
    }
}

/// Splits form-feed separated text into pages numbered from 1. The trailing empty
/// page left by a final form feed is dropped.
pub fn split_form_feed_pages(text: &str) -> Vec<Page> {
    let mut parts: Vec<&str> = text.split('\u{c}').collect();
    if parts.len() > 1 && parts.last().is_some_and(|p| p.trim().is_empty()) {
        parts.pop();
    }
    parts
        .into_iter()
        .enumerate()
        .map(|(i, t)| Page {
            number: Some(i as u32 + 1),
            text: t.to_string(),
        })
        .collect()
}

/// UTF-8 text files as a single unnumbered page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load_pages(&self, path: &Path) -> Result<Vec<Page>, AppError> {
        let text = fs::read_to_string(path).map_err(|e| {
            AppError::new(codes::INGEST_FAILED, "Failed to read text document")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        Ok(vec![Page { number: None, text }])
    }
}

/// Picks a loader by file extension: `.pdf` goes through pdftotext, anything else
/// is read as text.
#[derive(Debug, Clone, Default)]
pub struct DefaultLoader {
    pdf: PdftotextLoader,
    text: PlainTextLoader,
}

impl DefaultLoader {
    pub fn new(pdftotext_bin: impl Into<String>) -> Self {
        Self {
            pdf: PdftotextLoader::new(pdftotext_bin),
            text: PlainTextLoader,
        }
    }
}

impl DocumentLoader for DefaultLoader {
    fn load_pages(&self, path: &Path) -> Result<Vec<Page>, AppError> {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            self.pdf.load_pages(path)
        } else {
            self.text.load_pages(path)
        }
    }
}
