use clipwatch_chat::InboundMessage;

/// Classification of one inbound chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `!silence` from the broadcaster or a moderator.
    Silence,
    /// The text contains a configured reaction keyword.
    Reaction,
    Ignore,
}

/// Demultiplex a message. Keyword matching is substring containment against
/// the lowercased text; one message counts as at most one reaction no matter
/// how many keywords it contains.
#[must_use]
pub fn classify(message: &InboundMessage, keywords: &[String]) -> Route {
    if message.text.trim().eq_ignore_ascii_case("!silence") {
        if message.is_broadcaster || message.is_moderator {
            return Route::Silence;
        }
        return Route::Ignore;
    }

    let lowered = message.text.to_lowercase();
    if keywords.iter().any(|k| lowered.contains(k.as_str())) {
        return Route::Reaction;
    }
    Route::Ignore
}
