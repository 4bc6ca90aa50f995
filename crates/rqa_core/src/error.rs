use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes shared by every crate in the workspace.
pub mod codes {
    pub const INGEST_FAILED: &str = "INGEST_FAILED";
    pub const INDEX_NOT_FOUND: &str = "INDEX_NOT_FOUND";
    pub const INDEX_CORRUPT: &str = "INDEX_CORRUPT";
    pub const INDEX_BUILD_FAILED: &str = "INDEX_BUILD_FAILED";
    pub const EMBEDDING_MISMATCH: &str = "EMBEDDING_MISMATCH";
    pub const PROVIDER_FAILED: &str = "PROVIDER_FAILED";
    pub const RETRIEVAL_INVALID: &str = "RETRIEVAL_INVALID";
    pub const LOG_WRITE_FAILED: &str = "LOG_WRITE_FAILED";
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    pub const CONFIG_MISSING_CREDENTIALS: &str = "CONFIG_MISSING_CREDENTIALS";
    pub const CLOCK_FAILED: &str = "CLOCK_FAILED";
    pub const OUTPUT_FAILED: &str = "OUTPUT_FAILED";
}

/// Single structured error shape used across the pipeline and surfaced by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(d) = self.details.as_ref() {
            write!(f, " ({d})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
