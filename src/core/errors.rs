use thiserror::Error;

#[derive(Error, Debug)]
pub enum HollaexError {
    /// The operation needs an open stream and the supervisor is not there.
    #[error("Stream is not connected")]
    NotConnected,

    /// A required parameter was missing or malformed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Any I/O failure on the websocket or HTTP transport.
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error: {code} - {message}")]
    ApiError { code: u16, message: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    /// The background stream task is gone, usually because the runtime shut down.
    #[error("Stream client task has shut down")]
    Closed,
}

impl HollaexError {
    /// Transport failures are absorbed by the reconnect loop and never fatal.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::ConnectionTimeout(_))
    }
}
