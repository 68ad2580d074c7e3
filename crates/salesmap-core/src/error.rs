use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Rejections raised while validating a user-submitted record.
///
/// These are produced before any record-source call is made.
#[derive(Debug, Error, PartialEq)]
pub enum SubmissionError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} must be a finite number, got \"{value}\"")]
    InvalidCoordinate { field: &'static str, value: String },

    #[error("sales must be positive, got {0}")]
    NonPositiveSales(f64),

    #[error("unknown category \"{0}\"")]
    UnknownCategory(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
