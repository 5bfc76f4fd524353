use reqwest::StatusCode;
use thiserror::Error;

/// Failures while retrieving or decoding the feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed endpoint returned HTTP {0}")]
    Status(StatusCode),

    #[error("feed too large: {0} bytes (max {max} bytes)", max = crate::feed::MAX_FEED_SIZE)]
    TooLarge(u64),

    #[error("failed to parse feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),

    #[error("entry {entry} has no {field}")]
    MissingField { entry: String, field: &'static str },

    #[error("entry {entry} has a missing or unparsable publish timestamp")]
    InvalidTimestamp { entry: String },
}

/// Failures of the underlying persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Malformed query parameters.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid {field} {value:?}: expected YYYY-MM-DD HH:MM:SS")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("{field} {value:?} does not exist in the configured timezone")]
    NonexistentLocalTime { field: &'static str, value: String },

    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<tokio_rusqlite::Error> for AppError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        AppError::Store(StoreError::Database(e))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
