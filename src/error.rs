//! Error types for Synocast.

use thiserror::Error;

/// Library-level error type for Synocast operations.
#[derive(Error, Debug)]
pub enum SynocastError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Video host error: {0}")]
    Host(String),

    #[error("Stream manifest error: {0}")]
    Manifest(String),

    #[error("Stream manifest request timed out after {0} seconds")]
    ManifestTimeout(u64),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Retention error: {0}")]
    Retention(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Synocast operations.
pub type Result<T> = std::result::Result<T, SynocastError>;
