use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while reading or rewriting captions
#[derive(Error, Debug)]
pub enum EngineError {
    /// User-supplied pattern failed to compile
    #[error("Invalid regular expression: {0}")]
    InvalidPattern(String),

    /// A required text input was empty
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    /// Input was present but cannot be used as given
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No item with this id in the collection
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// An item with this id is already in the collection
    #[error("Duplicate item id: {0}")]
    DuplicateItem(String),

    /// The store backend does not support the requested operation
    #[error("Unsupported by this store: {0}")]
    Unsupported(&'static str),

    /// Backend failure reported by a store implementation
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl EngineError {
    /// Create an invalid pattern error
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a store backend error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
