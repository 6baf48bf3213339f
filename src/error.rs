//! Crate-wide error taxonomy.

use thiserror::Error;

/// Error kinds a scrape task can terminate with, per the taxonomy in the error
/// handling design: transient network conditions, rate limiting, anti-bot
/// blocks, empty extraction, parse/validation failures, bad configuration,
/// and internal/unexpected state.
#[derive(Error, Debug)]
pub enum Error {
    #[error("transient network error for {host}: {message}")]
    Transient { host: String, message: String },

    #[error("rate limited by {host}")]
    RateLimited { host: String },

    #[error("blocked by anti-bot defenses on {host}")]
    Blocked { host: String },

    #[error("extraction produced zero jobs for board {board_id}")]
    ExtractionEmpty { board_id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown job board: {0}")]
    UnknownBoard(String),

    #[error("task queue is at capacity ({capacity})")]
    QueueFull { capacity: usize },

    #[error("unknown task id: {0}")]
    UnknownTask(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("advisor call failed: {0}")]
    Advisor(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// A short machine-stable tag for the error kind, used as the `last_error`
    /// summary on a task and as a tag value in telemetry events.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Error::Transient { .. } | Error::Http(_) => "transient",
            Error::RateLimited { .. } => "rate_limited",
            Error::Blocked { .. } => "blocked",
            Error::ExtractionEmpty { .. } => "extraction_empty",
            Error::Validation(_) => "validation",
            Error::Configuration(_) | Error::UnknownBoard(_) | Error::UnknownTask(_) => {
                "configuration"
            }
            Error::QueueFull { .. } => "queue_full",
            Error::Advisor(_) => "advisor",
            Error::Url(_) | Error::Json(_) => "parse",
            Error::Internal(_) => "internal",
        }
    }

    /// Whether a router/scheduler retry is appropriate for this error kind.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transient { .. } | Error::RateLimited { .. } | Error::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
