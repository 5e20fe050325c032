//! Reaction-burst orchestrator: per-channel sliding-window detection,
//! cooldown bookkeeping, and the gated clip-creation sequence.
//!
//! The orchestrator owns all channel state. It consumes the
//! [`clipwatch_chat::ChatTransport`] and [`clipwatch_platform::PlatformApi`]
//! capabilities and never touches credentials or wire protocols itself.

pub mod detector;
pub mod engine;
pub mod router;
pub mod sequencer;
pub mod state;

pub use {engine::Orchestrator, state::ChannelState};
