//! Error type for the documentation pipeline.

use std::path::PathBuf;

/// Errors surfaced by scanning, resolution and configuration.
///
/// Recoverable conditions (nameless blocks, unresolved `@see` targets,
/// module merges) are logged instead and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    /// The file violates the doc-comment structure (e.g. its first comment
    /// is not a doc comment).
    #[error("{}:{line}: {message}", file.display())]
    Structural {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// An item's class is not registered in the kind registry.
    #[error("{}:{line}: unknown {discriminant} '{class}'", file.display())]
    UnknownKind {
        discriminant: &'static str,
        class: String,
        file: PathBuf,
        line: usize,
    },

    #[error("unsupported file type: {}", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DocError>;
