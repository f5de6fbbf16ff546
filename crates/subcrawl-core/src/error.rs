use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid resource {}: {reason}", path.display())]
    Resource { path: PathBuf, reason: String },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("{0}")]
    Other(String),
}
