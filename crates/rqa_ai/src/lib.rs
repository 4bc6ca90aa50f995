pub mod answer;
pub mod embeddings;
pub mod guardrails;
mod http;
pub mod index;
pub mod llm;
pub mod ollama;
pub mod openai;
pub mod pipeline;
pub mod retrieve;

#[cfg(test)]
mod tests {
    use super::ollama::OllamaClient;
    use super::openai::OpenAiClient;
    use rqa_core::config::ApiKey;

    #[test]
    fn validates_provider_base_urls() {
        assert!(OllamaClient::new("http://127.0.0.1:11434").is_ok());
        assert!(OllamaClient::new("http://localhost").is_ok());
        assert!(OllamaClient::new("http://[::1]:11434").is_ok());
        assert!(OpenAiClient::new("https://api.openai.com/v1", ApiKey::new("sk-test")).is_ok());

        assert!(OllamaClient::new("ftp://127.0.0.1").is_err());
        assert!(OllamaClient::new("127.0.0.1:11434").is_err());
        assert!(OllamaClient::new("http://").is_err());
        assert!(OllamaClient::new("http://[::1").is_err());

        // Userinfo would let a URL point somewhere other than it appears to.
        assert!(OllamaClient::new("http://127.0.0.1@evil.com:11434").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:0").is_err());
        assert!(OllamaClient::new("http://127.0.0.1:99999").is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = OllamaClient::new("http://127.0.0.1:11434/").expect("client");
        assert_eq!(c.base_url(), "http://127.0.0.1:11434");
        let c = OpenAiClient::new("https://api.openai.com/v1/", ApiKey::new("k")).expect("client");
        assert_eq!(c.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = OllamaClient::new("gopher://x").expect_err("should fail");
        assert_eq!(err.code, "CONFIG_INVALID");
        assert!(err.details.unwrap_or_default().contains("scheme"));
    }
}
