use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or reshaping an evaluation dump.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Missing or unreadable input file.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed metadata JSON, or a required key is missing / mistyped.
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Data file length is not a whole number of 32-bit floats.
    #[error("{}: {len} bytes is not a multiple of 4", path.display())]
    TrailingBytes { path: PathBuf, len: usize },

    /// Float count is not divisible by the per-sample stride.
    #[error("shape mismatch: {len} floats cannot be split into samples of {stride} floats")]
    ShapeMismatch { len: usize, stride: usize },
}

impl EvalError {
    /// Whether this is a missing-file error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EvalError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
