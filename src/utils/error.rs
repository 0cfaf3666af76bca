// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// A document whose text cannot be obtained. Fatal for that document only.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("PDF text extraction failed for {path}: {reason}")]
    Pdf { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Row has {found} fields, schema '{schema}' expects {expected}")]
    Width {
        schema: &'static str,
        expected: usize,
        found: usize,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Document task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
