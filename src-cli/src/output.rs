use rqa_ai::pipeline::QaResponse;
use rqa_core::error::{codes, AppError};
use serde::Serialize;

use crate::commands::{BuildIndexReport, EvaluateReport, StatusReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Human-readable rendering for `--output pretty`.
pub trait Render {
    fn render(&self) -> String;
}

pub fn emit<T: Serialize + Render>(format: OutputFormat, value: &T) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).map_err(|e| {
                AppError::new(codes::OUTPUT_FAILED, "Failed to encode JSON output")
                    .with_details(e.to_string())
            })?;
            println!("{json}");
        }
        OutputFormat::Pretty => print!("{}", value.render()),
    }
    Ok(())
}

impl Render for QaResponse {
    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Answer:\n{}\n\n", self.answer.text.trim()));
        out.push_str("SOURCES:\n");
        if self.answer.citations.is_empty() {
            out.push_str("- (none)\n");
        }
        for c in &self.answer.citations {
            out.push_str(&format!("- {}\n", c.label()));
        }
        out.push_str(&format!(
            "\nFlags: hallucination={} redundancy={}\n",
            self.answer.flags.hallucination, self.answer.flags.redundancy
        ));
        if !self.answer.unsupported_figures.is_empty() {
            out.push_str(&format!(
                "Figures not found in sources: {}\n",
                self.answer.unsupported_figures.join(", ")
            ));
        }
        if let Some(e) = &self.log_error {
            out.push_str(&format!("warning: answer not logged: {e}\n"));
        }
        out
    }
}

impl Render for BuildIndexReport {
    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Indexed {} chunks from {} documents into {} (model {}, {} dims)\n",
            self.index.chunk_count,
            self.documents.len(),
            self.index_dir,
            self.index.model.as_deref().unwrap_or("-"),
            self.index.dims.unwrap_or(0)
        ));
        for d in &self.documents {
            out.push_str(&format!("- {}: {} pages, {} chunks\n", d.source, d.pages, d.chunks));
        }
        if !self.skipped.is_empty() {
            out.push_str(&format!("Skipped {} documents:\n", self.skipped.len()));
            for d in &self.skipped {
                out.push_str(&format!("- {}: {}\n", d.path, d.error));
            }
        }
        out
    }
}

impl Render for EvaluateReport {
    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Evaluated {} queries from {}; log written to {}\n",
            self.summary.total, self.queries_file, self.out_csv
        ));
        out.push_str(&format!("Hallucination flags: {}\n", self.summary.hallucination_flags));
        out.push_str(&format!("Redundancy flags: {}\n", self.summary.redundancy_flags));
        out.push_str(&format!("Refusals: {}\n", self.summary.refusals));
        out
    }
}

impl Render for StatusReport {
    fn render(&self) -> String {
        let mut out = String::new();
        match (&self.index, &self.index_error) {
            (Some(st), _) if st.ready => {
                out.push_str(&format!(
                    "Index: ready at {} ({} chunks, model {}, built {})\n",
                    self.index_dir,
                    st.chunk_count,
                    st.model.as_deref().unwrap_or("-"),
                    st.built_at.as_deref().unwrap_or("-")
                ));
                for src in &st.sources {
                    out.push_str(&format!("- {src}\n"));
                }
            }
            (_, Some(e)) => {
                out.push_str(&format!("Index: unreadable at {}: {e}\n", self.index_dir));
            }
            _ => out.push_str("Index: not built (run `regqa build-index`)\n"),
        }
        out.push_str(&format!(
            "Providers: embedding={} generation={}\n",
            self.embedding_provider, self.generation_provider
        ));
        let key = if self.openai_key_present { "set" } else { "not set" };
        out.push_str(&format!("OPENAI_API_KEY: {key}\n"));
        for h in &self.ollama {
            if h.ok {
                out.push_str(&format!("Ollama {}: reachable\n", h.base_url));
            } else {
                out.push_str(&format!("Ollama {}: unreachable ({})\n", h.base_url, h.message));
            }
        }
        out
    }
}
