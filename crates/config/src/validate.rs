use crate::{
    error::{Error, Result},
    schema::Config,
};

/// Validate a loaded configuration. Called once at startup; any error here
/// aborts the launch.
pub fn validate(config: &Config) -> Result<()> {
    if config.monitored_channels().is_empty() {
        return Err(Error::NoChannels);
    }

    if config.keywords.is_empty() {
        return Err(Error::InvalidValue {
            name: "REACTION_KEYWORDS",
            value: String::new(),
            reason: "at least one keyword is required".into(),
        });
    }

    if config.reaction_threshold == 0 {
        return Err(Error::InvalidValue {
            name: "REACTION_THRESHOLD",
            value: "0".into(),
            reason: "threshold must be at least 1".into(),
        });
    }

    if config.reaction_window_secs == 0 {
        return Err(Error::InvalidValue {
            name: "REACTION_WINDOW",
            value: "0".into(),
            reason: "window must be at least 1 second".into(),
        });
    }

    Ok(())
}
