use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Transport-level failures: connection refused, socket closed
    /// unexpectedly. Recovered locally by the stream client's reconnect
    /// policy and surfaced to the controller only as a status change.
    #[error("Transport Error: {0}")]
    Transport(String),

    /// A single unparseable payload. Logged and dropped; never closes the
    /// connection or affects other messages.
    #[error("Malformed Message: {0}")]
    MalformedMessage(String),

    /// A position failed the coordinate-range or land/water check. The
    /// offending report is dropped from the forwarded collection; this is
    /// silent filtering, never user-visible.
    #[error("Validation Error: {0}")]
    Validation(String),

    /// Both the stream and the REST fallback failed. The one terminal,
    /// user-visible error; remedy is a manual reconnect.
    #[error("Fallback Exhausted: {0}")]
    FallbackExhausted(String),

    /// REST request failures (status codes, timeouts, decode errors).
    #[error("HTTP Error: {0}")]
    Http(String),

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Cache Error: {0}")]
    Cache(String),

    #[error("Timeout Error: {0}")]
    Timeout(String),

    #[error("Unknown Error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::MalformedMessage(format!("JSON decode error: {}", err))
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout(format!("HTTP request timed out: {}", err))
        } else {
            FeedError::Http(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::Transport(err.to_string())
    }
}

impl From<anyhow::Error> for FeedError {
    fn from(err: anyhow::Error) -> Self {
        FeedError::Unknown(err.to_string())
    }
}

impl FeedError {
    /// Whether a retry is meaningful for this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            FeedError::Transport(_) => true,
            FeedError::MalformedMessage(_) => false, // data format issues don't heal on retry
            FeedError::Validation(_) => false,
            FeedError::FallbackExhausted(_) => false, // terminal; manual reconnect only
            FeedError::Http(_) => true,
            FeedError::Config(_) => false,
            FeedError::Cache(_) => true,
            FeedError::Timeout(_) => true,
            FeedError::Unknown(_) => true,
        }
    }

    /// Whether the operation should be retried immediately rather than
    /// waiting for the next scheduled attempt.
    pub fn should_retry(&self) -> bool {
        self.is_recoverable()
            && matches!(
                self,
                FeedError::Transport(_) | FeedError::Http(_) | FeedError::Timeout(_)
            )
    }

    /// Coarse category for logging and metrics.
    pub fn categorize(&self) -> ErrorCategory {
        match self {
            FeedError::Transport(_) | FeedError::Timeout(_) => ErrorCategory::Network,
            FeedError::MalformedMessage(_) => ErrorCategory::Data,
            FeedError::Validation(_) => ErrorCategory::Data,
            FeedError::FallbackExhausted(_) => ErrorCategory::Terminal,
            FeedError::Http(_) => ErrorCategory::Network,
            FeedError::Config(_) => ErrorCategory::Configuration,
            FeedError::Cache(_) => ErrorCategory::Infrastructure,
            FeedError::Unknown(_) => ErrorCategory::Terminal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Infrastructure,
    Terminal,
}
