use thiserror::Error;

/// Errors from the sidecar transport.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("not connected to the sidecar")]
    NotConnected,

    #[error("timed out waiting for a sidecar ack")]
    AckTimeout,

    #[error("sidecar rejected {operation}: {message}")]
    Rejected { operation: &'static str, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("media decode error: {0}")]
    MediaDecode(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
