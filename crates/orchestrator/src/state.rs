use std::collections::VecDeque;

/// Per-channel detector state. One record per monitored channel, created at
/// startup and kept for the process lifetime.
#[derive(Debug)]
pub struct ChannelState {
    /// Reaction instants (unix millis), ascending, pruned to the sliding
    /// window on every update.
    pub(crate) reaction_times: VecDeque<u64>,
    /// Instant of the last armed (or cooldown-adjusted) clip attempt.
    pub(crate) last_action_ms: u64,
    /// One-way flag: chat confirmations suppressed, clips still created.
    pub(crate) silenced: bool,
}

impl ChannelState {
    /// `last_action_ms` starts one full cooldown in the past so the channel
    /// is eligible immediately.
    #[must_use]
    pub fn new(now_ms: u64, cooldown_ms: u64, silenced: bool) -> Self {
        Self {
            reaction_times: VecDeque::new(),
            last_action_ms: now_ms.saturating_sub(cooldown_ms),
            silenced,
        }
    }

    #[must_use]
    pub fn reaction_count(&self) -> usize {
        self.reaction_times.len()
    }

    #[must_use]
    pub fn is_silenced(&self) -> bool {
        self.silenced
    }
}
