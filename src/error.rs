//! Error types for page-forge.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::fonts::FontError;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of the measurement adapter.
#[derive(Error, Debug)]
pub enum MeasureError {
    /// The layout context could not be created.
    #[error("Measurement unavailable: {0}")]
    Unavailable(String),

    /// The layout pass itself failed.
    #[error("Layout error: {0}")]
    Layout(String),
}

/// Fatal failure of a pagination run.
#[derive(Error, Debug)]
pub enum PaginateError {
    /// A node could not be measured; the whole run is abandoned.
    #[error("Pagination aborted: {0}")]
    Measurement(#[from] MeasureError),
}

/// Failure to load a branding asset. Absorbed by the assembler.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset I/O error for {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Asset decoding error: {0}")]
    Decode(String),
}

/// Failure to load a pipeline configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level error for the pipeline, CLI and C ABI.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Paginate(#[from] PaginateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Font(#[from] FontError),

    /// Error serialising a report or page list.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
