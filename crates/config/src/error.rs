pub type Result<T> = std::result::Result<T, Error>;

/// Fatal configuration errors. These are the only errors that should stop
/// the process from launching.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing required environment variable: {name}")]
    MissingVar { name: &'static str },

    #[error("invalid value for {name}: {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("no channels to monitor: set TWITCH_CHANNELS (and/or SILENT_CHANNELS)")]
    NoChannels,
}
