use std::path::{Path, PathBuf};

pub type ViewerResult<T> = Result<T, ViewerError>;

#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    #[error("file does not exist: {}", path.display())]
    FileMissing { path: PathBuf },

    #[error("unable to decode {}: {reason}", path.display())]
    DecodeFailure { path: PathBuf, reason: String },

    #[error("unable to write cache entry {}: {reason}", path.display())]
    CacheWriteFailure { path: PathBuf, reason: String },

    #[error("no supported image files found")]
    NoSupportedFiles,

    #[error(
        "could not open any of the {initial} loaded files; images are corrupt, missing or in unsupported formats"
    )]
    CorpusExhausted { initial: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("render error: {0}")]
    Render(String),
}

impl ViewerError {
    pub fn missing(path: impl AsRef<Path>) -> Self {
        Self::FileMissing {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn decode(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::DecodeFailure {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn cache_write(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::CacheWriteFailure {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Errors that end the process. Everything else is compensated for locally.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoSupportedFiles
                | Self::CorpusExhausted { .. }
                | Self::InvalidConfig(_)
                | Self::Render(_)
        )
    }
}
