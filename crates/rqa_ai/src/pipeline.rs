use std::fs;
use std::path::Path;

use rqa_core::config::RetrievalConfig;
use rqa_core::domain::QueryRecord;
use rqa_core::error::{codes, AppError};
use rqa_core::session_log::{now_rfc3339_utc, CsvLog, SessionLogger};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::answer::{answer, AnswerResult};
use crate::embeddings::Embedder;
use crate::index::IndexHandle;
use crate::llm::Llm;
use crate::retrieve::retrieve;

#[derive(Debug, Clone, Serialize)]
pub struct QaResponse {
    pub answer: AnswerResult,
    pub record: QueryRecord,
    /// Set when the audit log could not be written. The answer is still valid.
    pub log_error: Option<AppError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub total: usize,
    pub hallucination_flags: usize,
    pub redundancy_flags: usize,
    pub refusals: usize,
}

/// Question in, cited answer out: retrieve, answer, then audit-log the result.
pub struct QaPipeline {
    retrieval: RetrievalConfig,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn Llm>,
    index: IndexHandle,
    logger: SessionLogger,
}

impl QaPipeline {
    pub fn new(
        retrieval: RetrievalConfig,
        embedder: Box<dyn Embedder>,
        llm: Box<dyn Llm>,
        index: IndexHandle,
        logger: SessionLogger,
    ) -> Result<Self, AppError> {
        retrieval.validate()?;
        Ok(Self {
            retrieval,
            embedder,
            llm,
            index,
            logger,
        })
    }

    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    fn run(&self, question: &str) -> Result<(AnswerResult, QueryRecord), AppError> {
        let chunks = retrieve(&self.index, self.embedder.as_ref(), question, &self.retrieval)?;
        let result = answer(self.llm.as_ref(), question, &chunks)?;
        let record = QueryRecord {
            timestamp: now_rfc3339_utc()?,
            query: question.trim().to_string(),
            answer: result.text.clone(),
            citations: result.citations.clone(),
            flag_hallucination: result.flags.hallucination,
            flag_redundancy: result.flags.redundancy,
        };
        Ok((result, record))
    }

    /// Answers one question and appends it to the session log. Logging failures are
    /// reported in `log_error` and never fail the call.
    pub fn ask(&self, question: &str) -> Result<QaResponse, AppError> {
        let (answer, record) = self.run(question)?;

        let log_error = if self.logger.is_enabled() {
            self.logger.record(&record).err()
        } else {
            None
        };
        if let Some(e) = log_error.as_ref() {
            warn!(error = %e, "query answered but not logged");
        }

        info!(
            chunks = answer.sources.len(),
            citations = answer.citations.len(),
            refused = answer.refused,
            hallucination = %answer.flags.hallucination,
            redundancy = %answer.flags.redundancy,
            "answered query"
        );
        Ok(QaResponse {
            answer,
            record,
            log_error,
        })
    }

    /// Runs every query and writes a fresh evaluation CSV. Stops at the first failure.
    pub fn evaluate(
        &self,
        queries: &[String],
        out_csv: &Path,
    ) -> Result<EvaluationSummary, AppError> {
        let csv = CsvLog::create(out_csv)?;
        let mut summary = EvaluationSummary::default();

        for query in queries.iter().filter(|q| !q.trim().is_empty()) {
            let (answer, record) = self.run(query)?;
            csv.append(&record)?;

            summary.total += 1;
            if answer.flags.hallucination.is_raised() {
                summary.hallucination_flags += 1;
            }
            if answer.flags.redundancy.is_raised() {
                summary.redundancy_flags += 1;
            }
            if answer.refused {
                summary.refusals += 1;
            }
            debug!(query = %record.query, "evaluated query");
        }

        info!(
            total = summary.total,
            hallucination = summary.hallucination_flags,
            redundancy = summary.redundancy_flags,
            refusals = summary.refusals,
            path = %out_csv.display(),
            "evaluation complete"
        );
        Ok(summary)
    }
}

/// One query per line; blank lines and `#` comments are skipped.
pub fn read_queries(path: &Path) -> Result<Vec<String>, AppError> {
    let text = fs::read_to_string(path).map_err(|e| {
        AppError::new(codes::CONFIG_INVALID, "Failed to read queries file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
