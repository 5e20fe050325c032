//! Chat transport: the [`ChatTransport`]/[`MessageHandler`] seam the
//! orchestrator is written against, plus a thin Twitch IRC-over-WebSocket
//! implementation. No chat-protocol logic leaks past this crate.

pub mod error;
pub mod irc;
pub mod parse;
pub mod transport;

pub use {
    error::{Error, Result},
    irc::IrcTransport,
    parse::{IrcEvent, parse_line},
    transport::{ChatTransport, InboundMessage, MessageHandler},
};

/// Production Twitch IRC WebSocket endpoint.
pub const IRC_WS_URL: &str = "wss://irc-ws.chat.twitch.tv:443";
