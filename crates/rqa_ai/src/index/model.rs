use rqa_core::domain::Chunk;
use serde::{Deserialize, Serialize};

pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Contents of `index_meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMeta {
    pub format_version: u32,
    pub model: String,
    pub dims: usize,
    pub chunk_count: usize,
    pub sources: Vec<String>,
    pub built_at: String, // RFC3339
}

/// One row of `index_vectors.json`; rows are positionally aligned with `index_chunks.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredVector {
    pub chunk_id: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexStatus {
    pub ready: bool,
    pub model: Option<String>,
    pub dims: Option<usize>,
    pub chunk_count: usize,
    #[serde(default)]
    pub sources: Vec<String>,
    pub built_at: Option<String>,
}

impl IndexStatus {
    pub fn not_ready() -> Self {
        Self {
            ready: false,
            model: None,
            dims: None,
            chunk_count: 0,
            sources: Vec::new(),
            built_at: None,
        }
    }
}

impl From<&IndexMeta> for IndexStatus {
    fn from(meta: &IndexMeta) -> Self {
        Self {
            ready: true,
            model: Some(meta.model.clone()),
            dims: Some(meta.dims),
            chunk_count: meta.chunk_count,
            sources: meta.sources.clone(),
            built_at: Some(meta.built_at.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}
