//! Error types shared across the Libros crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, LibrosError>;

#[derive(Error, Debug)]
pub enum LibrosError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl LibrosError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
