//! Platform API surface: user lookup, live status, stream start time, and
//! clip creation, behind the [`PlatformApi`] trait with a Helix HTTP
//! implementation.

pub mod api;
pub mod error;
pub mod helix;

pub use {
    api::{ClipId, PlatformApi},
    error::{Error, Result},
    helix::HelixClient,
};

/// Production Helix API base URL.
pub const HELIX_URL: &str = "https://api.twitch.tv/helix";

/// Public viewing URL for a created clip.
#[must_use]
pub fn clip_url(clip_id: &ClipId) -> String {
    format!("https://clips.twitch.tv/{}", clip_id.as_str())
}
