use std::time::Duration;

use rqa_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::http::{decode_error, provider_error, truncate_chars};
use crate::ollama::OllamaClient;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> String {
        format!("ollama:{}", self.model)
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        let prompt = truncate_chars(input, 12_000);

        let url = format!("{}/api/embeddings", self.client.base_url());
        let req = EmbeddingsRequest {
            model: &self.model,
            prompt,
        };
        let resp = ureq::post(&url)
            .timeout(Duration::from_secs(10))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new(codes::PROVIDER_FAILED, "Failed to encode embeddings request")
                    .with_details(e.to_string())
            })?)
            .map_err(|e| provider_error("embeddings", &self.model, e))?;

        let v: EmbeddingsResponse = resp.into_json().map_err(|e| decode_error("embeddings", e))?;
        if v.embedding.is_empty() {
            return Err(AppError::new(codes::PROVIDER_FAILED, "Embeddings response was empty")
                .with_details(format!("model={}", self.model)));
        }
        Ok(v.embedding)
    }
}
