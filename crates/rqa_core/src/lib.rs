pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod session_log;
