use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for caption parsing and bulk edit behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum tag length (in characters) for a token to enter the tag index
    pub min_tag_chars: usize,

    /// Separator used when rebuilding a caption from tokens
    pub join_separator: String,

    /// Separator placed between inserted text and the matched text
    pub insert_separator: String,

    /// Maximum number of caption writes in flight during a bulk operation
    pub write_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_tag_chars: 2,
            join_separator: ", ".to_string(),
            insert_separator: " ".to_string(),
            write_concurrency: 10,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|err| EngineError::invalid_config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.min_tag_chars == 0 {
            return Err(EngineError::invalid_config("min_tag_chars must be > 0"));
        }

        if !self.join_separator.contains(',') {
            return Err(EngineError::invalid_config(format!(
                "join_separator ({:?}) must contain a comma",
                self.join_separator
            )));
        }

        if self.insert_separator.contains(',') {
            return Err(EngineError::invalid_config(format!(
                "insert_separator ({:?}) must not contain a comma",
                self.insert_separator
            )));
        }

        if self.write_concurrency == 0 {
            return Err(EngineError::invalid_config("write_concurrency must be > 0"));
        }

        Ok(())
    }
}
