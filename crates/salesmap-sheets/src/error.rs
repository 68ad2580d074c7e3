use thiserror::Error;

/// Failures reaching or writing to a record source.
///
/// Neither variant is retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network, auth, or server failure; the source could not be reached.
    #[error("record source unavailable: {0}")]
    Unavailable(String),

    /// The source was reached but refused the write (quota, bad request).
    #[error("record source rejected the request: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Unavailable(err.to_string())
    }
}
