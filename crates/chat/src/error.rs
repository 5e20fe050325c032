/// Crate-wide result type for chat transport operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport is not connected (or its outbound queue is gone).
    #[error("chat transport not connected: {message}")]
    NotConnected { message: String },

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn not_connected(message: impl std::fmt::Display) -> Self {
        Self::NotConnected {
            message: message.to_string(),
        }
    }
}
