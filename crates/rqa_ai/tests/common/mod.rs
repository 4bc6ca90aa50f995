#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rqa_ai::embeddings::Embedder;
use rqa_ai::llm::Llm;
use rqa_core::domain::Chunk;
use rqa_core::error::AppError;
use rqa_core::ingest::new_chunk;

pub const VOCAB: &[&str] = &[
    "capital",
    "tier",
    "cet1",
    "buffer",
    "conservation",
    "countercyclical",
    "credit",
    "operational",
    "liquidity",
    "ratio",
];

/// One dimension per vocabulary word, counting occurrences. Text without any
/// vocabulary word embeds to the zero vector.
pub struct VocabEmbedder {
    calls: AtomicUsize,
}

impl VocabEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for VocabEmbedder {
    fn model_id(&self) -> String {
        format!("vocab:{}", VOCAB.len())
    }

    fn dims(&self) -> Option<usize> {
        Some(VOCAB.len())
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut v = vec![0.0f32; VOCAB.len()];
        for token in input.split(|c: char| !c.is_alphanumeric()) {
            let token = token.to_lowercase();
            if let Some(i) = VOCAB.iter().position(|w| *w == token) {
                v[i] += 1.0;
            }
        }
        Ok(v)
    }
}

pub struct MockLlm {
    reply: Result<String, AppError>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err(AppError::new("PROVIDER_FAILED", "chat completion request failed")
                .with_details("status=503")
                .with_retryable(true)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

impl Llm for MockLlm {
    fn model_id(&self) -> String {
        "mock:llm".to_string()
    }

    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().expect("prompts lock").push(prompt.to_string());
        self.reply.clone()
    }
}

/// Four chunks over three regulatory sources.
pub fn regulatory_chunks() -> Vec<Chunk> {
    vec![
        new_chunk(
            "capital_requirements.pdf",
            0,
            Some(3),
            "Tier 1 capital ratio must be at least 6% and the CET1 ratio at least 4.5%.".to_string(),
        ),
        new_chunk(
            "capital_requirements.pdf",
            1,
            Some(4),
            "The capital conservation buffer is 2.5% of risk-weighted assets.".to_string(),
        ),
        new_chunk(
            "operational_risk.pdf",
            0,
            Some(1),
            "Operational risk guidelines require sound governance.".to_string(),
        ),
        new_chunk(
            "liquidity.pdf",
            0,
            Some(2),
            "Liquidity coverage ratio must exceed 100%.".to_string(),
        ),
    ]
}
