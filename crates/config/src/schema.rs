use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Immutable bot configuration, loaded once at startup.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Channels where clip confirmations are announced in chat.
    pub channels: Vec<String>,
    /// Channels monitored without chat announcements.
    pub silent_channels: Vec<String>,
    /// Lowercased keywords counted as reaction events.
    pub keywords: Vec<String>,
    /// Sliding window for counting reactions, in seconds.
    pub reaction_window_secs: u64,
    /// Reactions within the window needed to trigger a clip.
    pub reaction_threshold: usize,
    /// Minimum seconds between triggered clips per channel.
    pub cooldown_secs: u64,

    pub client_id: String,
    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: Secret<String>,
    /// Seed token pair from the environment; the stored pair wins when both
    /// are present.
    #[serde(skip)]
    pub access_token: Option<Secret<String>>,
    #[serde(skip)]
    pub refresh_token: Option<Secret<String>>,
    /// Secondary token-refresh relay base URL (enables the fallback
    /// refresh provider when set).
    pub refresh_relay_url: Option<String>,
}

impl Config {
    /// All monitored channels: normal + silent, lowercased, de-duplicated,
    /// original order preserved.
    #[must_use]
    pub fn monitored_channels(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.channels
            .iter()
            .chain(self.silent_channels.iter())
            .map(|c| c.to_lowercase())
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }

    /// Whether a channel starts in silenced mode.
    #[must_use]
    pub fn is_silent(&self, channel: &str) -> bool {
        let channel = channel.to_lowercase();
        self.silent_channels.iter().any(|c| *c == channel)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("channels", &self.channels)
            .field("silent_channels", &self.silent_channels)
            .field("keywords", &self.keywords)
            .field("reaction_window_secs", &self.reaction_window_secs)
            .field("reaction_threshold", &self.reaction_threshold)
            .field("cooldown_secs", &self.cooldown_secs)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_relay_url", &self.refresh_relay_url)
            .finish()
    }
}

/// Serialize a `Secret<String>` by exposing its inner value. Only used for
/// fields that must round-trip through storage.
pub fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use secrecy::ExposeSecret;
    serializer.serialize_str(secret.expose_secret())
}
