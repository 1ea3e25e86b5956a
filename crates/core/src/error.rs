use std::path::PathBuf;

use thiserror::Error;

/// Per-module extraction failure. Never fatal to a run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Not a PE image at all (wrong magic, truncated headers, ...).
    #[error("Not a valid PE image: {0}")]
    NotPe(String),

    /// A PE image without a CLI header, e.g. a native DLL.
    #[error("The module does not contain CLI metadata")]
    NotManaged,

    /// The CLI metadata is present but inconsistent or truncated.
    #[error("Malformed CLI metadata: {0}")]
    Malformed(String),
}

impl LoadError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        LoadError::Malformed(msg.into())
    }
}

/// Errors raised once the PE container has been accepted. A missing CLI
/// header surfaces as `NotSupported`; everything else is bad metadata.
impl From<dotscope::Error> for LoadError {
    fn from(err: dotscope::Error) -> Self {
        match err {
            dotscope::Error::NotSupported => LoadError::NotManaged,
            other => LoadError::Malformed(other.to_string()),
        }
    }
}

/// Fatal errors that abort an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Directory '{}' does not exist.", .0.display())]
    PathNotFound(PathBuf),

    #[error("No dll files found in directory: '{}'", .0.display())]
    NoModulesFound(PathBuf),

    #[error("Invalid configuration at {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Convenience result type for analysis operations.
pub type SpyResult<T> = Result<T, AnalysisError>;
