use async_trait::async_trait;

use crate::error::Result;

/// An inbound chat message, already stripped of protocol framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Lowercase channel login (no `#` prefix).
    pub channel: String,
    /// Lowercase sender login.
    pub sender: String,
    pub text: String,
    /// Sender is a moderator of the channel.
    pub is_moderator: bool,
    /// Sender is the channel owner.
    pub is_broadcaster: bool,
}

/// Outbound chat capability consumed by the orchestrator.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Join a channel so its messages are delivered.
    async fn join(&self, channel: &str) -> Result<()>;

    /// Send a message to a channel.
    async fn send(&self, channel: &str, text: &str) -> Result<()>;
}

/// Inbound message sink; the orchestrator provides the implementation.
///
/// The transport delivers messages one at a time and awaits each call, so
/// per-channel ordering is preserved and the arm decision for a message
/// completes before the next message is read.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: InboundMessage);
}
