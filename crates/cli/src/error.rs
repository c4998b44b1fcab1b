use std::path::PathBuf;

use cobalt_types::BlobTypeError;
use thiserror::Error;

/// Failures while locating, reading or writing the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open file {}", .0.display())]
    OpenFile(PathBuf),

    #[error("failed to create parent directory {}", .0.display())]
    ParentDir(PathBuf),

    #[error("failed to write file {}", .0.display())]
    WriteFile(PathBuf),

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to serialize configuration: {0}")]
    Serialize(String),

    #[error("refusing to overwrite existing file {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("invalid fork schedule: {0}")]
    Forks(#[from] BlobTypeError),
}
