use rqa_core::error::{codes, AppError};

use crate::http::normalize_base_url;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url)
            .timeout(std::time::Duration::from_millis(800))
            .call();

        match resp {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new(codes::PROVIDER_FAILED, "Ollama health check failed")
                    .with_details(format!("status={status}")),
            ),
            Err(e) => Err(AppError::new(codes::PROVIDER_FAILED, "Failed to reach Ollama")
                .with_details(format!("base_url={}; err={}", self.base_url, e))
                .with_retryable(true)),
        }
    }
}
