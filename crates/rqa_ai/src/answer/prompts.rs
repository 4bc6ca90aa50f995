use rqa_core::domain::Chunk;

/// Sentence the model must return verbatim when the context does not answer the question.
pub const REFUSAL_ANSWER: &str =
    "The provided documents do not contain sufficient information to answer this question.";

pub fn context_blocks(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let page = c
                .page
                .map(|p| p.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            format!("[chunk {}] source={} page={}\n{}", i + 1, c.source, page, c.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

pub fn guardrail_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are an enterprise financial risk assistant answering questions about regulatory documents.

STRICT RULES:
- Use ONLY the provided context. Do not use prior knowledge.
- If the answer is not present in the context, respond exactly with: "{REFUSAL_ANSWER}"
- Return each fact, number, or bullet point ONLY ONCE.
- Do NOT repeat ratios, percentages, or headings.
- Be concise and factual. Use bullet points where appropriate.
- Cite the supporting chunk labels, e.g. [chunk 1].

Context:
{context}

Question:
{question}

Answer:
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqa_core::ingest::new_chunk;

    #[test]
    fn context_blocks_label_each_chunk() {
        let chunks = vec![
            new_chunk("a.pdf", 0, Some(2), "CET1 ratio is 4.5%.".to_string()),
            new_chunk("notes.txt", 0, None, "Buffer text".to_string()),
        ];
        let blocks = context_blocks(&chunks);
        assert_eq!(
            blocks,
            "[chunk 1] source=a.pdf page=2\nCET1 ratio is 4.5%.\n\n---\n\n[chunk 2] source=notes.txt page=N/A\nBuffer text"
        );

        let prompt = guardrail_prompt("What is CET1?", &blocks);
        assert!(prompt.contains(REFUSAL_ANSWER));
        assert!(prompt.contains("Question:\nWhat is CET1?"));
        assert!(prompt.contains("ONLY ONCE"));
    }
}
