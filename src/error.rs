use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BlastDbError {
    #[error("can't determine the database type for {0} (expected nucleotide, protein or reverse-position-specific)")]
    #[diagnostic(code(blastdb::config::unknown_type))]
    UnknownDatabaseType(String),

    #[error("invalid database name: {0}")]
    InvalidDatabaseName(String),

    #[error("missing config file blastdb.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("fetching {url} failed: {message}")]
    FetchHttp { url: String, message: String },

    #[error("fetching {url} returned status {status}: {message}")]
    FetchStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("writing data fetched from {url} failed: {message}")]
    FetchIo { url: String, message: String },

    #[error("failed to decompress {url}: {message}")]
    Decompress { url: String, message: String },

    #[error("no source data at {0}; nothing to build the database from")]
    MissingSourceData(String),

    #[error("creating database {name} failed: {message}")]
    #[diagnostic(code(blastdb::build::failed))]
    Build { name: String, message: String },

    #[error("failed to construct HTTP client: {0}")]
    HttpClient(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl BlastDbError {
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            BlastDbError::FetchHttp { .. }
                | BlastDbError::FetchStatus { .. }
                | BlastDbError::FetchIo { .. }
                | BlastDbError::Decompress { .. }
        )
    }
}
