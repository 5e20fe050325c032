pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("platform API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The API answered but without the entity we asked for.
    #[error("no such user: {login}")]
    UnknownUser { login: String },

    /// Clip creation returned success but no identifier.
    #[error("clip creation returned no clip id")]
    MissingClipId,

    #[error("unparseable timestamp: {value}")]
    BadTimestamp { value: String },
}
