use rqa_core::config::RetrievalConfig;
use rqa_core::domain::Chunk;
use rqa_core::error::{codes, AppError};
use tracing::debug;

use crate::embeddings::Embedder;
use crate::index::{IndexHandle, ScoredChunk};

pub(crate) mod similarity;

/// Top-k hits for `question` with their cosine scores, best first. Hits at or below
/// `cfg.min_score` are dropped, so fewer than `top_k` may come back.
pub fn retrieve_scored(
    index: &IndexHandle,
    embedder: &dyn Embedder,
    question: &str,
    cfg: &RetrievalConfig,
) -> Result<Vec<ScoredChunk>, AppError> {
    let q = question.trim();
    if q.is_empty() {
        return Err(AppError::new(codes::RETRIEVAL_INVALID, "Question must not be empty"));
    }
    if cfg.top_k == 0 {
        return Err(AppError::new(
            codes::RETRIEVAL_INVALID,
            "top_k must be a positive integer",
        ));
    }

    let mut hits = index.search(embedder, q, cfg.top_k)?;
    let before = hits.len();
    hits.retain(|h| h.score > cfg.min_score);
    debug!(
        top_k = cfg.top_k,
        hits = hits.len(),
        below_floor = before - hits.len(),
        "retrieved context"
    );
    Ok(hits)
}

pub fn retrieve(
    index: &IndexHandle,
    embedder: &dyn Embedder,
    question: &str,
    cfg: &RetrievalConfig,
) -> Result<Vec<Chunk>, AppError> {
    Ok(retrieve_scored(index, embedder, question, cfg)?
        .into_iter()
        .map(|h| h.chunk)
        .collect())
}
