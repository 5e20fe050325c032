pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    /// HTTP transport failure talking to a token endpoint.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A token endpoint answered with a non-success status.
    #[error("token endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    /// Every configured refresh provider failed.
    #[error("all refresh providers failed")]
    AllProvidersFailed,

    /// The operator declined or timed out the device authorization.
    #[error("device authorization failed: {0}")]
    DeviceFlow(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl clipwatch_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

clipwatch_common::impl_context!();
