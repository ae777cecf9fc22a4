use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatadogMcpError>;

#[derive(Debug, Error)]
pub enum DatadogMcpError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid parameter {field}: {reason}")]
    InvalidParams { field: &'static str, reason: String },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("datadog returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("malformed upstream response: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
