//! Credential lifecycle: validation, dual-path refresh, scheduled renewal,
//! and failure escalation for the bot's long-lived OAuth token pair.

pub mod credential;
pub mod device;
pub mod error;
pub mod manager;
pub mod providers;
pub mod store;
pub mod validate;

pub use {
    credential::{Credential, SharedCredential, TokenPair},
    device::{DeviceCodeResponse, DeviceFlow},
    error::{Error, Result},
    manager::{CredentialManager, RefreshPolicy},
    providers::{OAuthRefreshProvider, RefreshProvider, RelayRefreshProvider},
    store::CredentialStore,
    validate::{TokenValidator, Validation},
};

/// Twitch token introspection endpoint.
pub const VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";
/// Twitch OAuth token endpoint (refresh + device-code grants).
pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
/// Twitch device code authorization endpoint.
pub const DEVICE_URL: &str = "https://id.twitch.tv/oauth2/device";

/// Scopes the bot needs: read chat, send chat, create clips, read subs.
pub const SCOPES: &str = "chat:read chat:edit clips:edit channel:read:subscriptions";
