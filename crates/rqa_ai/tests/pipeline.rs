mod common;

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use rqa_ai::answer::REFUSAL_ANSWER;
use rqa_ai::index::IndexStore;
use rqa_ai::llm::Llm;
use rqa_ai::pipeline::{read_queries, EvaluationSummary, QaPipeline};
use rqa_core::config::{ChunkingConfig, RetrievalConfig};
use rqa_core::domain::{Flag, QueryRecord};
use rqa_core::ingest::{ingest, DefaultLoader};
use rqa_core::session_log::{CsvLog, JsonLog, SessionLogger};

use common::{MockLlm, VocabEmbedder};

const ANSWER: &str = "- Tier 1 capital ratio: at least 6% [chunk 1]";

fn write_docs(dir: &Path) -> Vec<PathBuf> {
    let docs = [
        (
            "capital.txt",
            "Tier 1 capital ratio must be at least 6% and the CET1 ratio at least 4.5%.\r\n\
             The capital conservation buffer is 2.5% of risk-weighted assets.",
        ),
        ("liquidity.txt", "Liquidity coverage ratio must exceed 100%."),
    ];
    docs.iter()
        .map(|(name, text)| {
            let p = dir.join(name);
            fs::write(&p, text).expect("write doc");
            p
        })
        .collect()
}

fn pipeline(dir: &Path, llm: Box<dyn Llm>, logger: SessionLogger) -> QaPipeline {
    let paths = write_docs(dir);
    let report = ingest(&paths, &ChunkingConfig::default(), &DefaultLoader::new("pdftotext"))
        .expect("ingest");
    assert_eq!(report.documents.len(), 2);

    let store = IndexStore::open(dir.join("vector_index"));
    let embedder = VocabEmbedder::new();
    store
        .build(&report.chunks, &embedder, "2026-10-18T09:00:00Z")
        .expect("build");
    let handle = store.load(&embedder).expect("load");

    QaPipeline::new(
        RetrievalConfig::default(),
        Box::new(embedder),
        llm,
        handle,
        logger,
    )
    .expect("pipeline")
}

fn csv_rows(path: &Path) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("open csv");
    rdr.records()
        .map(|r| r.expect("row").iter().map(|s| s.to_string()).collect())
        .collect()
}

#[test]
fn ask_answers_with_citations_and_logs_the_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("logs/qa_logs.csv");
    let json_path = dir.path().join("logs/qa_logs.json");
    let qa = pipeline(
        dir.path(),
        Box::new(MockLlm::replying(ANSWER)),
        SessionLogger::new(Some(CsvLog::open_append(&csv_path)), Some(JsonLog::new(&json_path))),
    );

    let resp = qa.ask("  What is the Tier 1 capital ratio?  ").expect("ask");

    assert_eq!(resp.answer.text, ANSWER);
    assert!(resp.log_error.is_none());
    assert_eq!(resp.record.query, "What is the Tier 1 capital ratio?");
    assert_eq!(resp.record.flag_hallucination, Flag::No);
    assert_eq!(resp.record.flag_redundancy, Flag::No);
    assert_eq!(resp.record.citations[0].label(), "capital.txt | page N/A");

    let rows = csv_rows(&csv_path);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], "What is the Tier 1 capital ratio?");
    assert_eq!(rows[1][2], ANSWER);
    assert!(rows[1][3].starts_with("capital.txt | page N/A"));
    assert_eq!(rows[1][4], "NO");

    let logged: Vec<QueryRecord> = JsonLog::new(&json_path).read_all().expect("json log");
    assert_eq!(logged, vec![resp.record]);
}

#[test]
fn unrelated_question_is_refused_without_generation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let json_path = dir.path().join("qa_logs.json");
    // A failing provider proves generation is skipped.
    let qa = pipeline(
        dir.path(),
        Box::new(MockLlm::failing()),
        SessionLogger::new(None, Some(JsonLog::new(&json_path))),
    );

    let resp = qa.ask("Who won the football match yesterday?").expect("ask");

    assert_eq!(resp.answer.text, REFUSAL_ANSWER);
    assert!(resp.answer.refused);
    assert!(resp.record.citations.is_empty());
    assert_eq!(resp.record.flag_hallucination, Flag::Yes);
    assert_eq!(JsonLog::new(&json_path).read_all().expect("json").len(), 1);
}

#[test]
fn log_failure_does_not_fail_the_query() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("qa_logs.csv");
    fs::create_dir_all(&csv_path).expect("directory in the way");
    let json_path = dir.path().join("qa_logs.json");
    let qa = pipeline(
        dir.path(),
        Box::new(MockLlm::replying(ANSWER)),
        SessionLogger::new(Some(CsvLog::open_append(&csv_path)), Some(JsonLog::new(&json_path))),
    );

    let resp = qa.ask("What is the Tier 1 capital ratio?").expect("ask still succeeds");

    assert_eq!(resp.answer.text, ANSWER);
    let err = resp.log_error.expect("log error reported");
    assert_eq!(err.code, "LOG_WRITE_FAILED");
    // The other sink is still written.
    assert_eq!(JsonLog::new(&json_path).read_all().expect("json").len(), 1);
}

#[test]
fn evaluate_writes_a_fresh_csv_and_counts_flags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let session_csv = dir.path().join("qa_logs.csv");
    let qa = pipeline(
        dir.path(),
        Box::new(MockLlm::replying(ANSWER)),
        SessionLogger::new(Some(CsvLog::open_append(&session_csv)), None),
    );
    let out = dir.path().join("evaluation_log.csv");
    fs::write(&out, "stale,rows\nfrom,before\n").expect("stale file");

    let queries = vec![
        "What is the Tier 1 capital ratio?".to_string(),
        "   ".to_string(),
        "Explain the capital conservation buffer.".to_string(),
        "Who won the football match yesterday?".to_string(),
    ];
    let summary = qa.evaluate(&queries, &out).expect("evaluate");

    assert_eq!(
        summary,
        EvaluationSummary {
            total: 3,
            hallucination_flags: 1,
            redundancy_flags: 0,
            refusals: 1,
        }
    );
    let rows = csv_rows(&out);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0][0], "Timestamp");
    assert_eq!(rows[3][2], REFUSAL_ANSWER);
    assert_eq!(rows[3][4], "YES");
    assert!(!session_csv.exists());
}

#[test]
fn evaluate_stops_at_the_first_provider_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let qa = pipeline(
        dir.path(),
        Box::new(MockLlm::failing()),
        SessionLogger::new(None, None),
    );
    let queries = vec!["List Tier 1 and CET1 capital ratios.".to_string()];

    let err = qa
        .evaluate(&queries, &dir.path().join("evaluation_log.csv"))
        .expect_err("provider failure");
    assert_eq!(err.code, "PROVIDER_FAILED");
}

#[test]
fn concurrent_asks_are_all_logged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let json_path = dir.path().join("qa_logs.json");
    let qa = pipeline(
        dir.path(),
        Box::new(MockLlm::replying(ANSWER)),
        SessionLogger::new(None, Some(JsonLog::new(&json_path))),
    );

    std::thread::scope(|s| {
        let workers: Vec<_> = (0..6)
            .map(|i| {
                let qa = &qa;
                s.spawn(move || qa.ask(&format!("Tier 1 capital ratio, take {i}")))
            })
            .collect();
        for w in workers {
            let resp = w.join().expect("join").expect("ask");
            assert!(resp.log_error.is_none());
        }
    });

    assert_eq!(JsonLog::new(&json_path).read_all().expect("json").len(), 6);
}

#[test]
fn query_files_skip_blank_lines_and_comments() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("queries.txt");
    fs::write(&path, "# regression set\nWhat is CET1?\n\n  Explain the buffer.  \n")
        .expect("write");
    assert_eq!(
        read_queries(&path).expect("read"),
        vec!["What is CET1?".to_string(), "Explain the buffer.".to_string()]
    );

    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/eval_queries.txt");
    assert_eq!(read_queries(&fixture).expect("fixture").len(), 5);

    let err = read_queries(&dir.path().join("missing.txt")).expect_err("missing");
    assert_eq!(err.code, "CONFIG_INVALID");
}
