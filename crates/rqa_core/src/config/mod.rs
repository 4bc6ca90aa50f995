use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{codes, AppError};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Embedding backend used for both index build and query. Switching backends
/// requires a rebuild; the index rejects vectors from a different model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "provider", rename_all = "kebab-case")]
pub enum EmbeddingProviderConfig {
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_embedding_model")]
        model: String,
        #[serde(default = "default_openai_base_url")]
        base_url: String,
    },
    Ollama {
        #[serde(default = "default_ollama_embedding_model")]
        model: String,
        #[serde(default = "default_ollama_base_url")]
        base_url: String,
    },
    /// Deterministic token-hash vectors. Offline; useful for fixtures and smoke runs.
    Hash {
        #[serde(default = "default_hash_dims")]
        dimensions: usize,
    },
}

impl EmbeddingProviderConfig {
    pub fn with_default_model(provider: &str) -> Result<Self, AppError> {
        match provider.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi {
                model: default_openai_embedding_model(),
                base_url: default_openai_base_url(),
            }),
            "ollama" => Ok(Self::Ollama {
                model: default_ollama_embedding_model(),
                base_url: default_ollama_base_url(),
            }),
            "hash" => Ok(Self::Hash {
                dimensions: default_hash_dims(),
            }),
            other => Err(AppError::new(
                codes::CONFIG_INVALID,
                "Unknown embedding provider",
            )
            .with_details(format!("provider={other}; expected openai|ollama|hash"))),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai",
            Self::Ollama { .. } => "ollama",
            Self::Hash { .. } => "hash",
        }
    }

    pub fn uses_openai(&self) -> bool {
        matches!(self, Self::OpenAi { .. })
    }

    fn set_model(&mut self, value: String) {
        match self {
            Self::OpenAi { model, .. } | Self::Ollama { model, .. } => *model = value,
            Self::Hash { .. } => {
                warn!(model = %value, "embedding model override ignored for hash provider");
            }
        }
    }
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self::OpenAi {
            model: default_openai_embedding_model(),
            base_url: default_openai_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "provider", rename_all = "kebab-case")]
pub enum GenerationProviderConfig {
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_chat_model")]
        model: String,
        #[serde(default = "default_openai_base_url")]
        base_url: String,
        #[serde(default)]
        temperature: f32,
    },
    Ollama {
        #[serde(default = "default_ollama_chat_model")]
        model: String,
        #[serde(default = "default_ollama_base_url")]
        base_url: String,
    },
}

impl GenerationProviderConfig {
    pub fn with_default_model(provider: &str) -> Result<Self, AppError> {
        match provider.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi {
                model: default_openai_chat_model(),
                base_url: default_openai_base_url(),
                temperature: 0.0,
            }),
            "ollama" => Ok(Self::Ollama {
                model: default_ollama_chat_model(),
                base_url: default_ollama_base_url(),
            }),
            other => Err(AppError::new(
                codes::CONFIG_INVALID,
                "Unknown generation provider",
            )
            .with_details(format!("provider={other}; expected openai|ollama"))),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai",
            Self::Ollama { .. } => "ollama",
        }
    }

    pub fn uses_openai(&self) -> bool {
        matches!(self, Self::OpenAi { .. })
    }

    fn set_model(&mut self, value: String) {
        match self {
            Self::OpenAi { model, .. } | Self::Ollama { model, .. } => *model = value,
        }
    }
}

impl Default for GenerationProviderConfig {
    fn default() -> Self {
        Self::OpenAi {
            model: default_openai_chat_model(),
            base_url: default_openai_base_url(),
            temperature: 0.0,
        }
    }
}

/// How a chunk's `source` is stamped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SourceNaming {
    #[default]
    Basename,
    FullPath,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IngestErrorPolicy {
    #[default]
    ContinueOnError,
    AbortOnFirstError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default)]
    pub source_naming: SourceNaming,
    #[serde(default)]
    pub on_error: IngestErrorPolicy,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.chunk_size == 0 {
            return Err(AppError::new(
                codes::CONFIG_INVALID,
                "chunk_size must be greater than zero",
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::new(
                codes::CONFIG_INVALID,
                "chunk_overlap must be smaller than chunk_size",
            )
            .with_details(format!(
                "chunk_size={}; chunk_overlap={}",
                self.chunk_size, self.chunk_overlap
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            source_naming: SourceNaming::default(),
            on_error: IngestErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Hits scoring at or below this floor are dropped.
    #[serde(default)]
    pub min_score: f32,
}

impl RetrievalConfig {
    pub fn with_top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.top_k == 0 {
            return Err(AppError::new(
                codes::CONFIG_INVALID,
                "top_k must be a positive integer",
            ));
        }
        if !self.min_score.is_finite() {
            return Err(AppError::new(codes::CONFIG_INVALID, "min_score must be finite")
                .with_details(format!("min_score={}", self.min_score)));
        }
        Ok(())
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: 0.0,
        }
    }
}

/// Audit log locations. `None` disables that sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    #[serde(default = "default_log_csv")]
    pub csv_path: Option<PathBuf>,
    #[serde(default = "default_log_json")]
    pub json_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            csv_path: default_log_csv(),
            json_path: default_log_json(),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Complete runtime configuration. Built once at startup and passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RqaConfig {
    #[serde(default)]
    pub documents: Vec<PathBuf>,
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
    #[serde(default)]
    pub embedding: EmbeddingProviderConfig,
    #[serde(default)]
    pub generation: GenerationProviderConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default = "default_pdftotext")]
    pub pdftotext_bin: String,
    // Secrets only come from the environment.
    #[serde(skip)]
    pub openai_api_key: Option<ApiKey>,
}

impl Default for RqaConfig {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            index_dir: default_index_dir(),
            embedding: EmbeddingProviderConfig::default(),
            generation: GenerationProviderConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            log: LogConfig::default(),
            pdftotext_bin: default_pdftotext(),
            openai_api_key: None,
        }
    }
}

impl RqaConfig {
    /// Defaults, then the optional JSON file, then process environment overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self, AppError> {
        Self::from_sources(config_path, |name| std::env::var(name).ok())
    }

    pub fn from_sources(
        config_path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let mut cfg = match config_path {
            Some(p) => Self::read_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn read_file(path: &Path) -> Result<Self, AppError> {
        let bytes = fs::read(path).map_err(|e| {
            AppError::new(codes::CONFIG_INVALID, "Failed to read config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let cfg: Self = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new(codes::CONFIG_INVALID, "Failed to decode config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(cfg)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), AppError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string());

        if let Some(key) = get(OPENAI_API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.openai_api_key = Some(ApiKey(key));
        }

        // Provider names are case-insensitive; naming the current provider keeps its settings.
        if let Some(p) = get("REGQA_EMBEDDING_PROVIDER").map(|v| v.to_ascii_lowercase()) {
            if p != self.embedding.provider_name() {
                self.embedding = EmbeddingProviderConfig::with_default_model(&p)?;
            }
        }
        if let Some(m) = get("REGQA_EMBEDDING_MODEL").filter(|v| !v.is_empty()) {
            self.embedding.set_model(m);
        }
        if let Some(p) = get("REGQA_GENERATION_PROVIDER").map(|v| v.to_ascii_lowercase()) {
            if p != self.generation.provider_name() {
                self.generation = GenerationProviderConfig::with_default_model(&p)?;
            }
        }
        if let Some(m) = get("REGQA_GENERATION_MODEL").filter(|v| !v.is_empty()) {
            self.generation.set_model(m);
        }

        if let Some(url) = get("OPENAI_BASE_URL").filter(|v| !v.is_empty()) {
            if let EmbeddingProviderConfig::OpenAi { base_url, .. } = &mut self.embedding {
                *base_url = url.clone();
            }
            if let GenerationProviderConfig::OpenAi { base_url, .. } = &mut self.generation {
                *base_url = url;
            }
        }
        if let Some(url) = get("REGQA_OLLAMA_URL").filter(|v| !v.is_empty()) {
            if let EmbeddingProviderConfig::Ollama { base_url, .. } = &mut self.embedding {
                *base_url = url.clone();
            }
            if let GenerationProviderConfig::Ollama { base_url, .. } = &mut self.generation {
                *base_url = url;
            }
        }

        if let Some(v) = get("REGQA_CHUNK_SIZE") {
            self.chunking.chunk_size = parse_env("REGQA_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("REGQA_CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_env("REGQA_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = get("REGQA_TOP_K") {
            self.retrieval.top_k = parse_env("REGQA_TOP_K", &v)?;
        }
        if let Some(v) = get("REGQA_MIN_SCORE") {
            self.retrieval.min_score = parse_env("REGQA_MIN_SCORE", &v)?;
        }
        if let Some(v) = get("REGQA_INDEX_DIR").filter(|v| !v.is_empty()) {
            self.index_dir = PathBuf::from(v);
        }
        // An empty value disables the sink.
        if let Some(v) = get("REGQA_LOG_CSV") {
            self.log.csv_path = non_empty_path(v);
        }
        if let Some(v) = get("REGQA_LOG_JSON") {
            self.log.json_path = non_empty_path(v);
        }
        if let Some(v) = get("REGQA_DOCUMENTS").filter(|v| !v.is_empty()) {
            self.documents = std::env::split_paths(&v)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(v) = get("REGQA_PDFTOTEXT").filter(|v| !v.is_empty()) {
            self.pdftotext_bin = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        if let EmbeddingProviderConfig::Hash { dimensions } = &self.embedding {
            if *dimensions == 0 {
                return Err(AppError::new(
                    codes::CONFIG_INVALID,
                    "hash embedding dimensions must be greater than zero",
                ));
            }
        }
        if let GenerationProviderConfig::OpenAi { temperature, .. } = &self.generation {
            if !(0.0..=2.0).contains(temperature) {
                return Err(AppError::new(
                    codes::CONFIG_INVALID,
                    "temperature must be within 0.0..=2.0",
                )
                .with_details(format!("temperature={temperature}")));
            }
        }
        if self.index_dir.as_os_str().is_empty() {
            return Err(AppError::new(codes::CONFIG_INVALID, "index_dir is empty"));
        }
        Ok(())
    }

    /// Hosted providers need a key; fail before any request is attempted.
    pub fn require_credentials(&self) -> Result<(), AppError> {
        let needs_openai = self.embedding.uses_openai() || self.generation.uses_openai();
        if needs_openai && self.openai_api_key.is_none() {
            return Err(AppError::new(
                codes::CONFIG_MISSING_CREDENTIALS,
                "OPENAI_API_KEY not found in environment variables",
            )
            .with_details(format!(
                "embedding={}; generation={}",
                self.embedding.provider_name(),
                self.generation.provider_name()
            )));
        }
        Ok(())
    }
}

/// Load `.env` from the working directory or its parents. Returns the file that was
/// loaded, or `None` when there is none. Runs before logging is configured so `RUST_LOG`
/// may come from the file; callers log the outcome.
pub fn load_dotenv() -> Result<Option<PathBuf>, AppError> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(dotenv_error(&e)),
    }
}

/// Like [`load_dotenv`] for an explicit file. Variables already set are kept.
pub fn load_dotenv_from(path: &Path) -> Result<Option<PathBuf>, AppError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(Some(path.to_path_buf())),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(dotenv_error(&e).with_details(format!("path={}; err={}", path.display(), e))),
    }
}

fn dotenv_error(e: &dotenvy::Error) -> AppError {
    AppError::new(codes::CONFIG_INVALID, "Failed to load .env file").with_details(e.to_string())
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> Result<T, AppError>
where
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| {
        AppError::new(codes::CONFIG_INVALID, "Invalid environment value")
            .with_details(format!("{name}={raw}; err={e}"))
    })
}

fn non_empty_path(v: String) -> Option<PathBuf> {
    if v.is_empty() {
        None
    } else {
        Some(PathBuf::from(v))
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_openai_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ollama_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_ollama_chat_model() -> String {
    "llama3.1".to_string()
}

const fn default_hash_dims() -> usize {
    512
}

const fn default_chunk_size() -> usize {
    800
}

const fn default_chunk_overlap() -> usize {
    150
}

const fn default_top_k() -> usize {
    3
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("vector_index")
}

fn default_log_csv() -> Option<PathBuf> {
    Some(PathBuf::from("qa_logs.csv"))
}

fn default_log_json() -> Option<PathBuf> {
    Some(PathBuf::from("qa_logs.json"))
}

fn default_pdftotext() -> String {
    "pdftotext".to_string()
}
