use {secrecy::Secret, tracing::info};

use crate::{
    error::{Error, Result},
    schema::Config,
};

/// Default reaction keywords, matching the bot's historical behavior.
const DEFAULT_KEYWORDS: &str = "lol,lmao,+2,lmfao";

const DEFAULT_REACTION_WINDOW_SECS: u64 = 30;
const DEFAULT_REACTION_THRESHOLD: usize = 10;
const DEFAULT_COOLDOWN_SECS: u64 = 120;

/// Load configuration from the process environment (after loading `.env`
/// if present).
pub fn load_from_env() -> Result<Config> {
    dotenvy::dotenv().ok();
    from_vars(|name| std::env::var(name).ok())
}

/// Build a [`Config`] from an environment-style lookup function.
///
/// Split out from [`load_from_env`] so tests can supply variables without
/// touching the process environment.
pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let channels = parse_list(get("TWITCH_CHANNELS").as_deref());
    let silent_channels = parse_list(get("SILENT_CHANNELS").as_deref());

    let keywords = parse_list(Some(
        get("REACTION_KEYWORDS")
            .unwrap_or_else(|| DEFAULT_KEYWORDS.to_string())
            .as_str(),
    ));

    let reaction_window_secs = parse_number(
        "REACTION_WINDOW",
        get("REACTION_WINDOW"),
        DEFAULT_REACTION_WINDOW_SECS,
    )?;
    let reaction_threshold = parse_number(
        "REACTION_THRESHOLD",
        get("REACTION_THRESHOLD"),
        DEFAULT_REACTION_THRESHOLD,
    )?;
    let cooldown_secs = parse_number(
        "COOLDOWN_PERIOD",
        get("COOLDOWN_PERIOD"),
        DEFAULT_COOLDOWN_SECS,
    )?;

    let client_id = require(&get, "TWITCH_CLIENT_ID")?;
    let client_secret = Secret::new(require(&get, "TWITCH_CLIENT_SECRET")?);

    let config = Config {
        channels,
        silent_channels,
        keywords,
        reaction_window_secs,
        reaction_threshold,
        cooldown_secs,
        client_id,
        client_secret,
        access_token: get("TWITCH_ACCESS_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .map(Secret::new),
        refresh_token: get("TWITCH_REFRESH_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .map(Secret::new),
        refresh_relay_url: get("TOKEN_REFRESH_RELAY_URL").filter(|v| !v.trim().is_empty()),
    };

    info!(
        channels = ?config.channels,
        silent_channels = ?config.silent_channels,
        keywords = ?config.keywords,
        window_secs = config.reaction_window_secs,
        threshold = config.reaction_threshold,
        cooldown_secs = config.cooldown_secs,
        "configuration loaded"
    );

    Ok(config)
}

/// Split a comma-separated list, trimming and lowercasing each entry.
fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| Error::InvalidValue {
            name,
            value: v,
            reason: "expected a non-negative integer".into(),
        }),
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<String> {
    get(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::MissingVar { name })
}
