//! Error types for SASL payload handling.

/// Result type alias for SASL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SASL error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The challenge was not valid base64.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded challenge was not valid UTF-8.
    #[error("challenge is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The decoded challenge was not the expected JSON document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
