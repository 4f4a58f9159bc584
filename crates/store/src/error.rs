use caption_engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Snapshot {path} is corrupted: {reason}")]
    CorruptedSnapshot { path: PathBuf, reason: String },

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned {status} for {method} {url}")]
    RemoteStatus {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl StoreError {
    pub fn corrupted(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptedSnapshot {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Engine(inner) => inner,
            other => EngineError::store(other.to_string()),
        }
    }
}
