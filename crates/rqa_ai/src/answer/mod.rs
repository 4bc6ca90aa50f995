use rqa_core::domain::{dedup_citations, Chunk, Citation, Flag};
use rqa_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::guardrails::{hallucination_flag, is_refusal, redundancy_flag, unsupported_figures};
use crate::llm::Llm;

mod prompts;

pub use prompts::{context_blocks, guardrail_prompt, REFUSAL_ANSWER};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerFlags {
    pub hallucination: Flag,
    pub redundancy: Flag,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    pub text: String,
    /// Derived from `sources`, de-duplicated by `(source, page)` in first-seen order.
    pub citations: Vec<Citation>,
    pub sources: Vec<Chunk>,
    pub flags: AnswerFlags,
    pub refused: bool,
    /// Figures in the answer that no context chunk contains. Informational.
    pub unsupported_figures: Vec<String>,
}

/// Answers `question` from `chunks` only. With no chunks the refusal sentence is
/// returned without calling the provider.
pub fn answer(llm: &dyn Llm, question: &str, chunks: &[Chunk]) -> Result<AnswerResult, AppError> {
    let text = if chunks.is_empty() {
        debug!("no context retrieved; refusing without generation");
        REFUSAL_ANSWER.to_string()
    } else {
        let prompt = guardrail_prompt(question.trim(), &context_blocks(chunks));
        llm.generate(&prompt)?
    };

    let citations = dedup_citations(chunks);
    let flags = AnswerFlags {
        hallucination: hallucination_flag(&citations),
        redundancy: redundancy_flag(&text),
    };
    let refused = is_refusal(&text);
    let unsupported = if refused {
        Vec::new()
    } else {
        unsupported_figures(&text, chunks)
    };

    if flags.redundancy.is_raised() {
        warn!(model = %llm.model_id(), "answer repeats lines");
    }
    if !unsupported.is_empty() {
        warn!(figures = ?unsupported, "answer contains figures absent from context");
    }

    Ok(AnswerResult {
        text,
        citations,
        sources: chunks.to_vec(),
        flags,
        refused,
        unsupported_figures: unsupported,
    })
}
