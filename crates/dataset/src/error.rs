use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("No images were found")]
    NoImages,

    #[error("No items to export")]
    EmptyCollection,

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Refusing to write outside the export directory: {0}")]
    UnsafeName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
