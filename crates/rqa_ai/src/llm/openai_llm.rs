use std::time::Duration;

use rqa_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use super::Llm;
use crate::http::{decode_error, provider_error};
use crate::openai::OpenAiClient;

#[derive(Debug, Clone)]
pub struct OpenAiLlm {
    client: OpenAiClient,
    model: String,
    temperature: f32,
}

impl OpenAiLlm {
    pub fn new(client: OpenAiClient, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl Llm for OpenAiLlm {
    fn model_id(&self) -> String {
        format!("openai:{}", self.model)
    }

    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let resp = self
            .client
            .post("/chat/completions", Duration::from_secs(60))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new(codes::PROVIDER_FAILED, "Failed to encode chat request")
                    .with_details(e.to_string())
            })?)
            .map_err(|e| provider_error("chat completion", &self.model, e))?;

        let body: ChatResponse = resp
            .into_json()
            .map_err(|e| decode_error("chat completion", e))?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AppError::new(codes::PROVIDER_FAILED, "Chat completion was empty")
                .with_details(format!("model={}", self.model)));
        }
        Ok(text.trim().to_string())
    }
}
