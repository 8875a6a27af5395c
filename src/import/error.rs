use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to a media server.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    #[error("Server returned HTTP {0}")]
    BadStatus(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            ProviderError::BadStatus(status.as_u16())
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Unreachable(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Target directory is missing or not writable: {0}")]
    DirectoryUnavailable(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
