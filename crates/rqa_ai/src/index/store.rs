use std::cmp::Ordering;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use rqa_core::domain::Chunk;
use rqa_core::error::{codes, AppError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::model::{IndexMeta, IndexStatus, ScoredChunk, StoredVector, INDEX_FORMAT_VERSION};
use crate::embeddings::Embedder;
use crate::retrieve::similarity;

const META_FILE: &str = "index_meta.json";
const CHUNKS_FILE: &str = "index_chunks.json";
const VECTORS_FILE: &str = "index_vectors.json";

/// On-disk vector index: a directory holding meta, chunks and vectors as JSON.
///
/// Builds are written to a sibling `<dir>.staging` directory and renamed into place,
/// so an interrupted or failed build leaves the previous index loadable.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn meta_path(&self) -> PathBuf {
        self.root.join(META_FILE)
    }

    fn sibling(&self, suffix: &str) -> Result<PathBuf, AppError> {
        let name = self.root.file_name().ok_or_else(|| {
            AppError::new(codes::INDEX_BUILD_FAILED, "Index location must name a directory")
                .with_details(format!("path={}", self.root.display()))
        })?;
        let mut name = OsString::from(name);
        name.push(suffix);
        Ok(self.root.with_file_name(name))
    }

    fn read_meta(&self) -> Result<Option<IndexMeta>, AppError> {
        let path = self.meta_path();
        if !path.is_file() {
            return Ok(None);
        }
        let meta: IndexMeta = read_json(&path, "index meta")?;
        if meta.format_version != INDEX_FORMAT_VERSION {
            return Err(AppError::new(codes::INDEX_CORRUPT, "Unsupported index format version")
                .with_details(format!(
                    "path={}; expected={}; got={}",
                    path.display(),
                    INDEX_FORMAT_VERSION,
                    meta.format_version
                )));
        }
        Ok(Some(meta))
    }

    pub fn status(&self) -> Result<IndexStatus, AppError> {
        Ok(match self.read_meta()? {
            Some(meta) => IndexStatus::from(&meta),
            None => IndexStatus::not_ready(),
        })
    }

    /// Embeds `chunks` in order and replaces any existing index. Nothing on disk changes
    /// unless every embedding succeeds with a consistent dimensionality.
    pub fn build(
        &self,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
        built_at: &str,
    ) -> Result<IndexStatus, AppError> {
        self.ensure_replaceable()?;
        let model = embedder.model_id();
        info!(
            model = %model,
            chunks = chunks.len(),
            path = %self.root.display(),
            "building vector index"
        );

        let mut dims = embedder.dims();
        let mut vectors: Vec<StoredVector> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let v = embedder.embed(&chunk.text).map_err(|e| {
                let details = format!(
                    "chunk_id={}; source={}; err={}",
                    chunk.chunk_id, chunk.source, e
                );
                e.with_details(details)
            })?;
            match dims {
                Some(d) if d != v.len() => {
                    return Err(AppError::new(
                        codes::INDEX_BUILD_FAILED,
                        "Embedding dimension mismatch across chunks",
                    )
                    .with_details(format!(
                        "expected={}; got={}; chunk_id={}",
                        d,
                        v.len(),
                        chunk.chunk_id
                    )));
                }
                Some(_) => {}
                None => dims = Some(v.len()),
            }
            vectors.push(StoredVector {
                chunk_id: chunk.chunk_id.clone(),
                vector: v,
            });
        }

        let mut sources: Vec<String> = Vec::new();
        for c in chunks {
            if !sources.contains(&c.source) {
                sources.push(c.source.clone());
            }
        }

        let meta = IndexMeta {
            format_version: INDEX_FORMAT_VERSION,
            model,
            dims: dims.unwrap_or(0),
            chunk_count: chunks.len(),
            sources,
            built_at: built_at.to_string(),
        };

        let staging = self.sibling(".staging")?;
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| {
                build_io_error("Failed to clear index staging directory", &staging, e)
            })?;
        }
        fs::create_dir_all(&staging)
            .map_err(|e| build_io_error("Failed to create index staging directory", &staging, e))?;
        write_json(&staging.join(CHUNKS_FILE), chunks, "index chunks")?;
        write_json(&staging.join(VECTORS_FILE), &vectors, "index vectors")?;
        write_json(&staging.join(META_FILE), &meta, "index meta")?;
        self.swap_in(&staging)?;

        info!(
            model = %meta.model,
            dims = meta.dims,
            chunks = meta.chunk_count,
            sources = meta.sources.len(),
            "vector index ready"
        );
        Ok(IndexStatus::from(&meta))
    }

    /// The index location may be absent, an empty directory, or a previous index.
    /// Anything else is left alone.
    fn ensure_replaceable(&self) -> Result<(), AppError> {
        if !self.root.exists() {
            return Ok(());
        }
        let refuse = |why: &str| {
            AppError::new(
                codes::INDEX_BUILD_FAILED,
                "Index location holds something other than a vector index",
            )
            .with_details(format!("path={}; {why}", self.root.display()))
        };
        if !self.root.is_dir() {
            return Err(refuse("not a directory"));
        }
        if self.meta_path().is_file() {
            return Ok(());
        }
        let mut entries = fs::read_dir(&self.root)
            .map_err(|e| build_io_error("Failed to inspect index directory", &self.root, e))?;
        if entries.next().is_some() {
            return Err(refuse("directory is not empty and has no index meta"));
        }
        Ok(())
    }

    fn swap_in(&self, staging: &Path) -> Result<(), AppError> {
        let previous = self.sibling(".previous")?;
        if previous.exists() {
            fs::remove_dir_all(&previous).map_err(|e| {
                build_io_error("Failed to clear previous index directory", &previous, e)
            })?;
        }

        let had_previous = self.root.exists();
        if had_previous {
            fs::rename(&self.root, &previous)
                .map_err(|e| build_io_error("Failed to move existing index aside", &self.root, e))?;
        }
        if let Err(e) = fs::rename(staging, &self.root) {
            if had_previous {
                if let Err(restore) = fs::rename(&previous, &self.root) {
                    warn!(
                        path = %self.root.display(),
                        error = %restore,
                        "failed to restore previous index"
                    );
                }
            }
            return Err(AppError::new(codes::INDEX_BUILD_FAILED, "Failed to finalize index build")
                .with_details(format!(
                    "staging={}; dest={}; err={}",
                    staging.display(),
                    self.root.display(),
                    e
                )));
        }
        if had_previous {
            if let Err(e) = fs::remove_dir_all(&previous) {
                warn!(path = %previous.display(), error = %e, "failed to remove previous index");
            }
        }
        Ok(())
    }

    /// Loads the persisted index for querying with `embedder`.
    pub fn load(&self, embedder: &dyn Embedder) -> Result<IndexHandle, AppError> {
        let meta = self.read_meta()?.ok_or_else(|| {
            AppError::new(codes::INDEX_NOT_FOUND, "No vector index found; build the index first")
                .with_details(format!("path={}", self.root.display()))
        })?;

        let model = embedder.model_id();
        if meta.model != model {
            return Err(AppError::new(
                codes::EMBEDDING_MISMATCH,
                "Index was built with a different embedding model",
            )
            .with_details(format!("index_model={}; embedder_model={}", meta.model, model)));
        }
        if let Some(d) = embedder.dims() {
            if meta.chunk_count > 0 && d != meta.dims {
                return Err(AppError::new(
                    codes::EMBEDDING_MISMATCH,
                    "Embedder dimensionality does not match the index",
                )
                .with_details(format!("index_dims={}; embedder_dims={}", meta.dims, d)));
            }
        }

        let chunks: Vec<Chunk> = read_json(&self.root.join(CHUNKS_FILE), "index chunks")?;
        let vectors: Vec<StoredVector> = read_json(&self.root.join(VECTORS_FILE), "index vectors")?;
        if chunks.len() != meta.chunk_count || vectors.len() != meta.chunk_count {
            return Err(AppError::new(codes::INDEX_CORRUPT, "Index entry counts disagree")
                .with_details(format!(
                    "meta={}; chunks={}; vectors={}",
                    meta.chunk_count,
                    chunks.len(),
                    vectors.len()
                )));
        }

        let mut entries: Vec<Entry> = Vec::with_capacity(chunks.len());
        for (chunk, stored) in chunks.into_iter().zip(vectors) {
            if stored.chunk_id != chunk.chunk_id {
                return Err(AppError::new(
                    codes::INDEX_CORRUPT,
                    "Index vectors are misaligned with chunks",
                )
                .with_details(format!(
                    "chunk_id={}; vector_chunk_id={}",
                    chunk.chunk_id, stored.chunk_id
                )));
            }
            if stored.vector.len() != meta.dims {
                return Err(AppError::new(
                    codes::INDEX_CORRUPT,
                    "Stored vector has the wrong dimensionality",
                )
                .with_details(format!(
                    "chunk_id={}; expected={}; got={}",
                    chunk.chunk_id,
                    meta.dims,
                    stored.vector.len()
                )));
            }
            let norm = similarity::l2_norm(&stored.vector);
            entries.push(Entry {
                chunk,
                vector: stored.vector,
                norm,
            });
        }

        debug!(model = %meta.model, chunks = entries.len(), "loaded vector index");
        Ok(IndexHandle { meta, entries })
    }
}

#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// Loaded, read-only index. Safe to share across threads.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    meta: IndexMeta,
    entries: Vec<Entry>,
}

impl IndexHandle {
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Top `k` chunks by cosine similarity to `query`, best first. Equal scores keep
    /// index order. Zero-norm vectors never match.
    pub fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let model = embedder.model_id();
        if model != self.meta.model {
            return Err(AppError::new(
                codes::EMBEDDING_MISMATCH,
                "Query embedder differs from the index model",
            )
            .with_details(format!("index_model={}; embedder_model={}", self.meta.model, model)));
        }

        let qv = embedder.embed(query)?;
        if qv.len() != self.meta.dims {
            return Err(AppError::new(
                codes::EMBEDDING_MISMATCH,
                "Query embedding dims do not match index dims",
            )
            .with_details(format!("index_dims={}; query_dims={}", self.meta.dims, qv.len())));
        }
        let qnorm = similarity::l2_norm(&qv);
        if qnorm == 0.0 {
            debug!("query embedding has zero norm; no matches");
            return Ok(Vec::new());
        }

        let mut hits: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.norm > 0.0)
            .map(|(i, e)| (i, similarity::cosine_similarity(&qv, &e.vector, qnorm, e.norm)))
            .collect();
        // Stable sort: ties stay in insertion order.
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        hits.truncate(k);

        Ok(hits
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }
}

fn build_io_error(message: &str, path: &Path, e: std::io::Error) -> AppError {
    AppError::new(codes::INDEX_BUILD_FAILED, message)
        .with_details(format!("path={}; err={}", path.display(), e))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<(), AppError> {
    let json = serde_json::to_vec(value).map_err(|e| {
        AppError::new(codes::INDEX_BUILD_FAILED, format!("Failed to encode {what}"))
            .with_details(e.to_string())
    })?;
    fs::write(path, json).map_err(|e| build_io_error(&format!("Failed to write {what}"), path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new(codes::INDEX_CORRUPT, format!("Failed to read {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new(codes::INDEX_CORRUPT, format!("Failed to decode {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}
