use std::time::Duration;

use rqa_core::config::ApiKey;
use rqa_core::error::AppError;

use crate::http::normalize_base_url;

/// Client for OpenAI-compatible HTTP APIs (`/embeddings`, `/chat/completions`).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: ApiKey,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: ApiKey) -> Result<Self, AppError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn post(&self, path: &str, timeout: Duration) -> ureq::Request {
        ureq::post(&format!("{}{}", self.base_url, path))
            .set("Authorization", &format!("Bearer {}", self.api_key.expose()))
            .timeout(timeout)
    }
}
