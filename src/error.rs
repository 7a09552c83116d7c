use std::path::PathBuf;
use thiserror::Error;

/// Failures a collector may report. None of them abort a report: a per-device
/// error drops that device, a per-category error drops that category.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to read {}: {source}", path.display())]
    DeviceRead { path: PathBuf, #[source] source: std::io::Error },
    #[error("{0} is not available on this system")]
    CategoryUnavailable(String),
    #[error("malformed device record: {0}")]
    Malformed(String),
    #[error("query failed: {0}")]
    Query(String),
}

impl CollectError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectError::DeviceRead { path: path.into(), source }
    }
}

pub type CollectResult<T> = Result<T, CollectError>;
