use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid pixel buffer length: expected {expected}, got {actual}")]
    InvalidDataLength { expected: usize, actual: usize },

    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("invalid pointer event on line {line}: {reason}")]
    ParseInput { line: usize, reason: String },
}

/// Failure to hand an event to the relay connection.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BoardError>;
