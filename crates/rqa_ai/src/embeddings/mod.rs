use rqa_core::config::{EmbeddingProviderConfig, RqaConfig};
use rqa_core::error::{codes, AppError};

use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;

pub mod hash_embed;
pub mod ollama_embed;
pub mod openai_embed;

pub use hash_embed::HashEmbedder;
pub use ollama_embed::OllamaEmbedder;
pub use openai_embed::OpenAiEmbedder;

/// Text → fixed-length vector. One embedder must be used for both building and
/// querying an index; `model_id` is persisted with the index to enforce that.
pub trait Embedder: Send + Sync {
    /// Provider-qualified model identifier, e.g. `openai:text-embedding-3-large`.
    fn model_id(&self) -> String;

    /// Output dimensionality when known up front.
    fn dims(&self) -> Option<usize> {
        None
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError>;
}

pub fn embedder_from_config(cfg: &RqaConfig) -> Result<Box<dyn Embedder>, AppError> {
    match &cfg.embedding {
        EmbeddingProviderConfig::OpenAi { model, base_url } => {
            let key = cfg.openai_api_key.clone().ok_or_else(|| {
                AppError::new(
                    codes::CONFIG_MISSING_CREDENTIALS,
                    "OPENAI_API_KEY not found in environment variables",
                )
            })?;
            let client = OpenAiClient::new(base_url, key)?;
            Ok(Box::new(OpenAiEmbedder::new(client, model)))
        }
        EmbeddingProviderConfig::Ollama { model, base_url } => {
            let client = OllamaClient::new(base_url)?;
            Ok(Box::new(OllamaEmbedder::new(client, model)))
        }
        EmbeddingProviderConfig::Hash { dimensions } => {
            Ok(Box::new(HashEmbedder::try_new(*dimensions)?))
        }
    }
}
