use thiserror::Error;

/// Unified application error type for the notice pipeline.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Errored while talking to a subprocess or stream. {0}")]
    Io(#[from] std::io::Error),
    #[error("Error parsing a number. {0}")]
    Parse(#[from] std::num::ParseIntError),
    #[error("Error from git. {0}")]
    Git(#[from] git2::Error),
    #[error("Error serializing json. {0}")]
    SerdeJsonSer(#[from] serde_json::Error),
    #[error("Timestamp is out of range. {0}")]
    TimeRange(#[from] time::error::ComponentRange),
    #[error("Error formatting a date. {0}")]
    TimeFormat(#[from] time::error::Format),
    #[error("Invalid configuration. {0}")]
    Config(String),
    #[error("Invalid revision id {0:?}")]
    InvalidRevision(String),
    #[error("Backend returned malformed data. {0}")]
    Integrity(String),
    #[error("Mail transport failed. {0}")]
    Transport(String),
}

/// Convenience alias for results that bubble `AppError`.
pub type AppResult<T> = Result<T, AppError>;
