//! Error types shared across the workspace

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the shared Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("options file not found: {}", path.display())]
    OptionsNotFound { path: PathBuf },

    #[error("failed to parse {}: {source}", path.display())]
    OptionsParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no provider supplies task '{0}'")]
    TaskNotFound(String),
}
