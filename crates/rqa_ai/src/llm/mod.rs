use rqa_core::config::{GenerationProviderConfig, RqaConfig};
use rqa_core::error::{codes, AppError};

use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;

pub mod ollama_llm;
pub mod openai_llm;

pub use ollama_llm::OllamaLlm;
pub use openai_llm::OpenAiLlm;

/// Prompt in, completion out. Implementations do not retry.
pub trait Llm: Send + Sync {
    fn model_id(&self) -> String;
    fn generate(&self, prompt: &str) -> Result<String, AppError>;
}

pub fn llm_from_config(cfg: &RqaConfig) -> Result<Box<dyn Llm>, AppError> {
    match &cfg.generation {
        GenerationProviderConfig::OpenAi {
            model,
            base_url,
            temperature,
        } => {
            let key = cfg.openai_api_key.clone().ok_or_else(|| {
                AppError::new(
                    codes::CONFIG_MISSING_CREDENTIALS,
                    "OPENAI_API_KEY not found in environment variables",
                )
            })?;
            let client = OpenAiClient::new(base_url, key)?;
            Ok(Box::new(OpenAiLlm::new(client, model, *temperature)))
        }
        GenerationProviderConfig::Ollama { model, base_url } => {
            let client = OllamaClient::new(base_url)?;
            Ok(Box::new(OllamaLlm::new(client, model)))
        }
    }
}
