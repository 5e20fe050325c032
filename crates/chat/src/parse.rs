//! Minimal IRCv3 line parser: just enough of the Twitch dialect to
//! route PRIVMSGs and answer PINGs. Anything else is reported as
//! [`IrcEvent::Other`] and ignored upstream.

use crate::transport::InboundMessage;

/// A single parsed IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// Server keepalive; must be answered with `PONG :<payload>`.
    Ping(String),
    Privmsg(InboundMessage),
    /// Numeric replies, JOIN echoes, NOTICEs and everything else.
    Other,
}

/// Parse one raw IRC line (trailing CRLF already stripped).
#[must_use]
pub fn parse_line(line: &str) -> IrcEvent {
    let mut rest = line.trim_end_matches(['\r', '\n']);
    if rest.is_empty() {
        return IrcEvent::Other;
    }

    // Optional tag block: @badge-info=;badges=moderator/1;mod=1;...
    let mut tags = "";
    if let Some(stripped) = rest.strip_prefix('@') {
        let Some((tag_part, after)) = stripped.split_once(' ') else {
            return IrcEvent::Other;
        };
        tags = tag_part;
        rest = after;
    }

    // Optional :nick!user@host prefix; the nick is the sender login.
    let mut sender = "";
    if let Some(stripped) = rest.strip_prefix(':') {
        let Some((prefix, after)) = stripped.split_once(' ') else {
            return IrcEvent::Other;
        };
        sender = prefix.split('!').next().unwrap_or(prefix);
        rest = after;
    }

    let (command, params) = match rest.split_once(' ') {
        Some((command, params)) => (command, params),
        None => (rest, ""),
    };

    match command {
        "PING" => IrcEvent::Ping(params.trim_start_matches(':').to_string()),
        "PRIVMSG" => {
            let Some((target, text)) = params.split_once(" :") else {
                return IrcEvent::Other;
            };
            let channel = target.trim_start_matches('#').to_ascii_lowercase();
            let badges = tag_value(tags, "badges").unwrap_or_default();
            let is_broadcaster = badges.split(',').any(|b| b.starts_with("broadcaster/"));
            let is_moderator = tag_value(tags, "mod") == Some("1")
                || badges.split(',').any(|b| b.starts_with("moderator/"));
            IrcEvent::Privmsg(InboundMessage {
                channel,
                sender: sender.to_ascii_lowercase(),
                text: text.to_string(),
                is_moderator,
                is_broadcaster,
            })
        }
        _ => IrcEvent::Other,
    }
}

fn tag_value<'a>(tags: &'a str, key: &str) -> Option<&'a str> {
    tags.split(';').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}
