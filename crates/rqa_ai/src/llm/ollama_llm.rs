use rqa_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use super::Llm;
use crate::http::{decode_error, provider_error};
use crate::ollama::OllamaClient;

#[derive(Debug, Clone)]
pub struct OllamaLlm {
    client: OllamaClient,
    model: String,
}

impl OllamaLlm {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl Llm for OllamaLlm {
    fn model_id(&self) -> String {
        format!("ollama:{}", self.model)
    }

    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/api/generate", self.client.base_url());
        let req = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let resp = ureq::post(&url)
            .timeout(std::time::Duration::from_secs(60))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new(codes::PROVIDER_FAILED, "Failed to encode generate request")
                    .with_details(e.to_string())
            })?)
            .map_err(|e| provider_error("generate", &self.model, e))?;

        let v: GenerateResponse = resp.into_json().map_err(|e| decode_error("generate", e))?;
        if v.response.trim().is_empty() {
            return Err(AppError::new(codes::PROVIDER_FAILED, "Generate response was empty")
                .with_details(format!("model={}", self.model)));
        }
        Ok(v.response.trim().to_string())
    }
}
