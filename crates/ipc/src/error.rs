//! Errors raised while encoding or decoding worker messages.

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Text frame was not a message this side understands
    #[error("Malformed worker message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Empty worker message")]
    Empty,
}
