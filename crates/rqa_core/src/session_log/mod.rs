use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::config::LogConfig;
use crate::domain::QueryRecord;
use crate::error::{codes, AppError};

pub const CSV_HEADER: [&str; 6] = [
    "Timestamp",
    "Query",
    "Answer",
    "Sources",
    "Flag_Hallucination",
    "Flag_Redundancy",
];

pub fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| {
            AppError::new(codes::CLOCK_FAILED, "Failed to format time").with_details(e.to_string())
        })
}

/// Append-only CSV log, one row per query.
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    /// Appends to `path`; the header is written when the file is new or empty.
    pub fn open_append(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Truncates `path` and writes the header. Used for evaluation runs.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let log = Self { path: path.into() };
        ensure_parent(&log.path)?;
        let file = fs::File::create(&log.path)
            .map_err(|e| log_err("Failed to create CSV log", &log.path, e))?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        w.write_record(CSV_HEADER)
            .map_err(|e| log_err("Failed to write CSV log header", &log.path, e))?;
        w.flush().map_err(|e| log_err("Failed to flush CSV log", &log.path, e))?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, rec: &QueryRecord) -> Result<(), AppError> {
        ensure_parent(&self.path)?;
        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| log_err("Failed to open CSV log", &self.path, e))?;

        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            w.write_record(CSV_HEADER)
                .map_err(|e| log_err("Failed to write CSV log header", &self.path, e))?;
        }
        let sources = rec.sources_joined();
        w.write_record([
            rec.timestamp.as_str(),
            rec.query.as_str(),
            rec.answer.as_str(),
            sources.as_str(),
            rec.flag_hallucination.as_str(),
            rec.flag_redundancy.as_str(),
        ])
        .map_err(|e| log_err("Failed to write CSV log row", &self.path, e))?;
        w.flush().map_err(|e| log_err("Failed to flush CSV log", &self.path, e))?;
        Ok(())
    }
}

/// JSON array log, rewritten on every append. Prior entries are always carried over;
/// an unreadable existing file is left untouched.
#[derive(Debug, Clone)]
pub struct JsonLog {
    path: PathBuf,
}

impl JsonLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<QueryRecord>, AppError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes =
            fs::read(&self.path).map_err(|e| log_err("Failed to read JSON log", &self.path, e))?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new(
                codes::LOG_WRITE_FAILED,
                "Existing JSON log is unreadable; refusing to overwrite it",
            )
            .with_details(format!("path={}; err={}", self.path.display(), e))
        })
    }

    pub fn append(&self, rec: &QueryRecord) -> Result<(), AppError> {
        ensure_parent(&self.path)?;
        let mut entries = self.read_all()?;
        entries.push(rec.clone());

        let json = serde_json::to_string_pretty(&entries).map_err(|e| {
            AppError::new(codes::LOG_WRITE_FAILED, "Failed to encode JSON log")
                .with_details(e.to_string())
        })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json.as_bytes()).map_err(|e| log_err("Failed to write JSON log", &tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::new(codes::LOG_WRITE_FAILED, "Failed to finalize JSON log write")
                .with_details(format!(
                    "tmp={}; dest={}; err={}",
                    tmp.display(),
                    self.path.display(),
                    e
                ))
        })?;
        Ok(())
    }
}

/// Audit sink for answered queries. Appends are serialized so concurrent callers
/// never interleave writes.
#[derive(Debug)]
pub struct SessionLogger {
    csv: Option<CsvLog>,
    json: Option<JsonLog>,
    lock: Mutex<()>,
}

impl SessionLogger {
    pub fn new(csv: Option<CsvLog>, json: Option<JsonLog>) -> Self {
        Self {
            csv,
            json,
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(cfg: &LogConfig) -> Self {
        Self::new(
            cfg.csv_path.clone().map(CsvLog::open_append),
            cfg.json_path.clone().map(JsonLog::new),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.csv.is_some() || self.json.is_some()
    }

    /// Writes to every configured sink even if one fails; the first failure is returned.
    pub fn record(&self, rec: &QueryRecord) -> Result<(), AppError> {
        let _guard = self.lock.lock();
        let mut first_err: Option<AppError> = None;

        if let Some(csv) = self.csv.as_ref() {
            if let Err(e) = csv.append(rec) {
                warn!(path = %csv.path().display(), error = %e, "csv log append failed");
                first_err.get_or_insert(e);
            }
        }
        if let Some(json) = self.json.as_ref() {
            if let Err(e) = json.append(rec) {
                warn!(path = %json.path().display(), error = %e, "json log append failed");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => {
                debug!(timestamp = %rec.timestamp, "recorded query");
                Ok(())
            }
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir).map_err(|e| {
            AppError::new(codes::LOG_WRITE_FAILED, "Failed to create log directory")
                .with_details(format!("path={}; err={}", dir.display(), e))
        }),
        _ => Ok(()),
    }
}

fn log_err(message: &str, path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(codes::LOG_WRITE_FAILED, message)
        .with_details(format!("path={}; err={}", path.display(), e))
}
