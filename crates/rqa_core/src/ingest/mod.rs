use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ChunkingConfig, IngestErrorPolicy, SourceNaming};
use crate::domain::{Chunk, Document};
use crate::error::{codes, AppError};

pub mod chunking;
pub mod loader;

pub use chunking::{chunk_document, new_chunk, split_with_overlap, ChunkSpan};
pub use loader::{DefaultLoader, DocumentLoader, PdftotextLoader, PlainTextLoader};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub source: String,
    pub path: String,
    pub pages: u32,
    pub chunks: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedDocument {
    pub path: String,
    pub error: AppError,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct IngestReport {
    pub chunks: Vec<Chunk>,
    pub documents: Vec<DocumentSummary>,
    pub skipped: Vec<SkippedDocument>,
}

/// Loads and chunks every document in order. Under `ContinueOnError` failing documents
/// are reported in `skipped`; under `AbortOnFirstError` the first failure is returned.
pub fn ingest(
    paths: &[PathBuf],
    cfg: &ChunkingConfig,
    loader: &dyn DocumentLoader,
) -> Result<IngestReport, AppError> {
    cfg.validate()?;

    let mut report = IngestReport::default();
    let mut seen_sources: BTreeSet<String> = BTreeSet::new();

    for path in paths {
        let outcome = load_document(path, cfg.source_naming, loader)
            .and_then(|doc| chunk_document(&doc, cfg).map(|chunks| (doc, chunks)));

        match outcome {
            Ok((doc, chunks)) => {
                if !seen_sources.insert(doc.source.clone()) {
                    warn!(
                        source = %doc.source,
                        "duplicate source name; citations will be ambiguous"
                    );
                }
                info!(
                    source = %doc.source,
                    pages = doc.pages.len(),
                    chunks = chunks.len(),
                    "ingested document"
                );
                report.documents.push(DocumentSummary {
                    source: doc.source,
                    path: doc.path.display().to_string(),
                    pages: doc.pages.len() as u32,
                    chunks: chunks.len() as u32,
                });
                report.chunks.extend(chunks);
            }
            Err(e) => match cfg.on_error {
                IngestErrorPolicy::AbortOnFirstError => return Err(e),
                IngestErrorPolicy::ContinueOnError => {
                    warn!(path = %path.display(), error = %e, "skipping document");
                    report.skipped.push(SkippedDocument {
                        path: path.display().to_string(),
                        error: e,
                    });
                }
            },
        }
    }

    info!(
        documents = report.documents.len(),
        skipped = report.skipped.len(),
        chunks = report.chunks.len(),
        "ingest finished"
    );
    Ok(report)
}

pub fn load_document(
    path: &Path,
    naming: SourceNaming,
    loader: &dyn DocumentLoader,
) -> Result<Document, AppError> {
    if !path.exists() {
        return Err(AppError::new(codes::INGEST_FAILED, "Document path does not exist")
            .with_details(format!("path={}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::new(codes::INGEST_FAILED, "Document path must be a file")
            .with_details(format!("path={}", path.display())));
    }

    let pages = loader.load_pages(path)?;
    if pages.iter().all(|p| p.text.trim().is_empty()) {
        return Err(AppError::new(
            codes::INGEST_FAILED,
            "Document contains no extractable text",
        )
        .with_details(format!("path={}", path.display())));
    }

    Ok(Document {
        source: source_name(path, naming),
        path: path.to_path_buf(),
        pages,
    })
}

pub fn source_name(path: &Path, naming: SourceNaming) -> String {
    match naming {
        SourceNaming::FullPath => path.display().to_string(),
        SourceNaming::Basename => path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string()),
    }
}
