use std::path::{Path, PathBuf};

use thiserror::Error;

pub type EtlResult<T> = Result<T, EtlError>;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("empty input: {0}")]
    EmptyInput(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("column '{0}' has no non-null value to propagate")]
    EmptyColumn(&'static str),
    #[error("extract error: {0}")]
    Extract(String),
    #[error("load error: {0}")]
    Load(String),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl EtlError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::EmptyInput(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn extract(message: impl Into<String>) -> Self {
        Self::Extract(message.into())
    }

    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot(message.into())
    }

    /// Maps a failed open into `InputNotFound` when the file is missing.
    pub fn from_open(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::InputNotFound(path.to_path_buf())
        } else {
            Self::Io(err)
        }
    }
}
