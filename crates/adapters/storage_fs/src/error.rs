//! Storage-specific error type wrapping filesystem and JSON errors.

use std::path::PathBuf;

use lorescript_domain::error::LoreError;

/// Errors originating from the filesystem storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading, writing, or renaming a file failed.
    #[error("i/o error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored file does not hold valid JSON of the expected shape.
    #[error("invalid JSON in {path:?}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| Self::Json { path, source }
    }
}

impl From<StorageError> for LoreError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
