use {async_trait::async_trait, chrono::{DateTime, Utc}};

use crate::error::Result;

/// Identifier of a created clip. Always present on success; the API client
/// is responsible for turning any response shape into exactly this or an
/// error, so callers never branch on shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipId(String);

impl ClipId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Streaming-platform operations the orchestrator depends on.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Resolve a channel login to its user id.
    async fn get_user_id(&self, login: &str) -> Result<String>;

    /// Whether the channel is currently live.
    async fn is_live(&self, user_id: &str) -> Result<bool>;

    /// When the current stream started, if live.
    async fn stream_start_time(&self, user_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Create a clip on the channel.
    async fn create_clip(&self, user_id: &str) -> Result<ClipId>;
}
