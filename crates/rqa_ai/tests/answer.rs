mod common;

use pretty_assertions::assert_eq;
use rqa_ai::answer::{answer, REFUSAL_ANSWER};
use rqa_ai::index::IndexStore;
use rqa_ai::retrieve::retrieve;
use rqa_core::config::RetrievalConfig;
use rqa_core::domain::{Citation, Flag};
use rqa_core::ingest::new_chunk;

use common::{regulatory_chunks, MockLlm, VocabEmbedder};

#[test]
fn tier_one_question_is_answered_with_citations_from_context() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().join("vector_index"));
    let embedder = VocabEmbedder::new();
    store
        .build(&regulatory_chunks(), &embedder, "2026-10-18T09:00:00Z")
        .expect("build");
    let handle = store.load(&embedder).expect("load");

    let question = "What is the Tier 1 capital ratio?";
    let chunks =
        retrieve(&handle, &embedder, question, &RetrievalConfig::default()).expect("retrieve");
    let llm = MockLlm::replying("- Tier 1 capital ratio: at least 6% [chunk 1]");

    let result = answer(&llm, question, &chunks).expect("answer");

    assert_eq!(result.text, "- Tier 1 capital ratio: at least 6% [chunk 1]");
    assert!(!result.citations.is_empty());
    assert!(result
        .citations
        .contains(&Citation {
            source: "capital_requirements.pdf".to_string(),
            page: Some(3),
        }));
    for c in &result.citations {
        assert!(chunks.iter().any(|ch| ch.citation() == *c));
    }
    assert_eq!(result.flags.hallucination, Flag::No);
    assert_eq!(result.flags.redundancy, Flag::No);
    assert!(!result.refused);
    assert!(result.unsupported_figures.is_empty());
    assert_eq!(result.sources, chunks);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Tier 1 capital ratio must be at least 6%"));
    assert!(prompts[0].contains("[chunk 1] source=capital_requirements.pdf page=3"));
    assert!(prompts[0].contains(question));
}

#[test]
fn single_chunk_index_cites_exactly_that_chunk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::open(dir.path().join("vector_index"));
    let embedder = VocabEmbedder::new();
    let chunk = new_chunk(
        "capital_requirements.pdf",
        0,
        Some(3),
        "Tier 1 capital ratio is 7%".to_string(),
    );
    store
        .build(std::slice::from_ref(&chunk), &embedder, "2026-10-18T09:00:00Z")
        .expect("build");
    let handle = store.load(&embedder).expect("load");

    let question = "What is the Tier 1 capital ratio?";
    let chunks =
        retrieve(&handle, &embedder, question, &RetrievalConfig::default()).expect("retrieve");
    assert_eq!(chunks, vec![chunk.clone()]);

    let llm = MockLlm::replying("- Tier 1 capital ratio: 7% [chunk 1]");
    let result = answer(&llm, question, &chunks).expect("answer");

    assert_eq!(
        result.citations,
        vec![Citation {
            source: "capital_requirements.pdf".to_string(),
            page: Some(3),
        }]
    );
    assert_eq!(result.flags.hallucination, Flag::No);
    assert!(result.unsupported_figures.is_empty());
    assert!(!result.refused);
}

#[test]
fn citations_are_deduplicated_by_source_and_page() {
    let chunks = regulatory_chunks();
    let repeated = vec![chunks[0].clone(), chunks[1].clone(), chunks[0].clone()];
    let llm = MockLlm::replying("CET1 is 4.5%.");

    let result = answer(&llm, "CET1?", &repeated).expect("answer");
    let labels: Vec<String> = result.citations.iter().map(|c| c.label()).collect();
    assert_eq!(
        labels,
        vec![
            "capital_requirements.pdf | page 3",
            "capital_requirements.pdf | page 4"
        ]
    );
    assert_eq!(result.sources.len(), 3);
}

#[test]
fn no_context_refuses_without_calling_the_provider() {
    let llm = MockLlm::replying("should not be used");

    let result = answer(&llm, "Who won the football match yesterday?", &[]).expect("answer");

    assert_eq!(result.text, REFUSAL_ANSWER);
    assert!(result.refused);
    assert!(result.citations.is_empty());
    assert_eq!(result.flags.hallucination, Flag::Yes);
    assert_eq!(result.flags.redundancy, Flag::No);
    assert!(llm.prompts().is_empty());
}

#[test]
fn model_refusal_with_context_is_recognised() {
    let llm = MockLlm::replying(REFUSAL_ANSWER);
    let result =
        answer(&llm, "What about market risk?", &regulatory_chunks()[..1]).expect("answer");
    assert!(result.refused);
    assert_eq!(result.flags.hallucination, Flag::No);
    assert!(result.unsupported_figures.is_empty());
}

#[test]
fn repeated_lines_raise_the_redundancy_flag() {
    let llm = MockLlm::replying("- CET1 minimum: 4.5%\n- Tier 1 minimum: 6%\n- CET1 minimum: 4.5%");
    let question = "List Tier 1 and CET1 capital ratios.";
    let result = answer(&llm, question, &regulatory_chunks()).expect("answer");
    assert_eq!(result.flags.redundancy, Flag::Yes);
}

#[test]
fn invented_figures_are_reported() {
    let llm = MockLlm::replying("The countercyclical buffer ranges up to 2.5% and 7% in stress.");
    let result = answer(&llm, "Countercyclical buffer?", &regulatory_chunks()).expect("answer");
    assert_eq!(result.unsupported_figures, vec!["7%".to_string()]);
}

#[test]
fn provider_failure_propagates() {
    let llm = MockLlm::failing();
    let err = answer(&llm, "CET1?", &regulatory_chunks()).expect_err("should fail");
    assert_eq!(err.code, "PROVIDER_FAILED");
    assert!(err.retryable);
}
