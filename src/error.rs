use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rate limit exceeded, please try again later")]
    RateLimited,

    #[error("League client is not running (no lockfile found)")]
    ClientNotRunning,

    #[error("Invalid lockfile: {0}")]
    InvalidLockfile(String),

    #[error("TLS error: {0}")]
    TlsError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("No champion data available")]
    NoChampionData,
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::JsonError(e.to_string())
    }
}
