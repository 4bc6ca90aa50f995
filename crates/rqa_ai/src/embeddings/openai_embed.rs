use std::time::Duration;

use rqa_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::http::{decode_error, provider_error, truncate_chars};
use crate::openai::OpenAiClient;

#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> String {
        format!("openai:{}", self.model)
    }

    fn dims(&self) -> Option<usize> {
        match self.model.as_str() {
            "text-embedding-3-large" => Some(3072),
            "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
            _ => None,
        }
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        // Chunks are far smaller than this; the bound only protects against oversized queries.
        let input = truncate_chars(input, 24_000);
        let req = EmbeddingsRequest {
            model: &self.model,
            input,
        };

        let resp = self
            .client
            .post("/embeddings", Duration::from_secs(30))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new(codes::PROVIDER_FAILED, "Failed to encode embeddings request")
                    .with_details(e.to_string())
            })?)
            .map_err(|e| provider_error("embeddings", &self.model, e))?;

        let body: EmbeddingsResponse = resp.into_json().map_err(|e| decode_error("embeddings", e))?;
        match body.data.into_iter().next() {
            Some(item) if !item.embedding.is_empty() => Ok(item.embedding),
            _ => Err(AppError::new(codes::PROVIDER_FAILED, "Embeddings response was empty")
                .with_details(format!("model={}", self.model))),
        }
    }
}
