use std::path::{Path, PathBuf};

use rqa_ai::embeddings::embedder_from_config;
use rqa_ai::index::{IndexStatus, IndexStore};
use rqa_ai::llm::{llm_from_config, Llm};
use rqa_ai::ollama::OllamaClient;
use rqa_ai::pipeline::{read_queries, EvaluationSummary, QaPipeline, QaResponse};
use rqa_core::config::{
    EmbeddingProviderConfig, GenerationProviderConfig, IngestErrorPolicy, RqaConfig,
};
use rqa_core::error::{codes, AppError};
use rqa_core::ingest::{ingest, DefaultLoader, DocumentSummary, SkippedDocument};
use rqa_core::session_log::{now_rfc3339_utc, SessionLogger};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct BuildIndexReport {
    pub index_dir: String,
    pub index: IndexStatus,
    pub documents: Vec<DocumentSummary>,
    pub skipped: Vec<SkippedDocument>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateReport {
    pub queries_file: String,
    pub out_csv: String,
    pub summary: EvaluationSummary,
}

#[derive(Debug, Serialize)]
pub struct ProviderHealth {
    pub base_url: String,
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub index_dir: String,
    pub index: Option<IndexStatus>,
    pub index_error: Option<AppError>,
    pub embedding_provider: String,
    pub generation_provider: String,
    pub openai_key_present: bool,
    pub ollama: Vec<ProviderHealth>,
}

pub fn build_index(
    cfg: &RqaConfig,
    docs: &[PathBuf],
    abort_on_error: bool,
) -> Result<BuildIndexReport, AppError> {
    let paths: &[PathBuf] = if docs.is_empty() { &cfg.documents } else { docs };
    if paths.is_empty() {
        return Err(AppError::new(codes::CONFIG_INVALID, "No documents to index")
            .with_details("pass document paths or set REGQA_DOCUMENTS"));
    }

    let mut chunking = cfg.chunking.clone();
    if abort_on_error {
        chunking.on_error = IngestErrorPolicy::AbortOnFirstError;
    }
    let report = ingest(paths, &chunking, &DefaultLoader::new(cfg.pdftotext_bin.as_str()))?;
    if report.documents.is_empty() {
        return Err(AppError::new(codes::INGEST_FAILED, "No document could be ingested")
            .with_details(format!("skipped={}", report.skipped.len())));
    }

    let embedder = embedder_from_config(cfg)?;
    let built_at = now_rfc3339_utc()?;
    let status =
        IndexStore::open(&cfg.index_dir).build(&report.chunks, embedder.as_ref(), &built_at)?;

    Ok(BuildIndexReport {
        index_dir: cfg.index_dir.display().to_string(),
        index: status,
        documents: report.documents,
        skipped: report.skipped,
    })
}

fn open_pipeline(cfg: &RqaConfig, logger: SessionLogger) -> Result<QaPipeline, AppError> {
    let embedder = embedder_from_config(cfg)?;
    let llm = llm_from_config(cfg)?;
    let index = IndexStore::open(&cfg.index_dir).load(embedder.as_ref())?;
    info!(
        model = %index.meta().model,
        chunks = index.len(),
        llm = %llm.model_id(),
        "pipeline ready"
    );
    QaPipeline::new(cfg.retrieval.clone(), embedder, llm, index, logger)
}

pub fn ask(cfg: &RqaConfig, question: &str, no_log: bool) -> Result<QaResponse, AppError> {
    let logger = if no_log {
        SessionLogger::new(None, None)
    } else {
        SessionLogger::from_config(&cfg.log)
    };
    open_pipeline(cfg, logger)?.ask(question)
}

pub fn evaluate(
    cfg: &RqaConfig,
    queries_file: &Path,
    out: &Path,
) -> Result<EvaluateReport, AppError> {
    let queries = read_queries(queries_file)?;
    if queries.is_empty() {
        return Err(AppError::new(codes::CONFIG_INVALID, "Queries file contains no questions")
            .with_details(format!("path={}", queries_file.display())));
    }

    let summary = open_pipeline(cfg, SessionLogger::new(None, None))?.evaluate(&queries, out)?;
    Ok(EvaluateReport {
        queries_file: queries_file.display().to_string(),
        out_csv: out.display().to_string(),
        summary,
    })
}

pub fn status(cfg: &RqaConfig) -> Result<StatusReport, AppError> {
    let (index, index_error) = match IndexStore::open(&cfg.index_dir).status() {
        Ok(st) => (Some(st), None),
        Err(e) => (None, Some(e)),
    };

    let mut ollama_urls: Vec<&str> = Vec::new();
    if let EmbeddingProviderConfig::Ollama { base_url, .. } = &cfg.embedding {
        ollama_urls.push(base_url);
    }
    if let GenerationProviderConfig::Ollama { base_url, .. } = &cfg.generation {
        if !ollama_urls.contains(&base_url.as_str()) {
            ollama_urls.push(base_url);
        }
    }
    let mut ollama = Vec::new();
    for url in ollama_urls {
        let client = OllamaClient::new(url)?;
        let health = match client.health_check() {
            Ok(()) => ProviderHealth {
                base_url: client.base_url().to_string(),
                ok: true,
                message: "reachable".to_string(),
            },
            Err(e) => ProviderHealth {
                base_url: client.base_url().to_string(),
                ok: false,
                message: e.to_string(),
            },
        };
        ollama.push(health);
    }

    Ok(StatusReport {
        index_dir: cfg.index_dir.display().to_string(),
        index,
        index_error,
        embedding_provider: cfg.embedding.provider_name().to_string(),
        generation_provider: cfg.generation.provider_name().to_string(),
        openai_key_present: cfg.openai_api_key.is_some(),
        ollama,
    })
}
