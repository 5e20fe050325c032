use tracing::debug;

use crate::state::ChannelState;

/// Record one reaction event and decide whether to arm a clip attempt.
///
/// Appends `now_ms`, prunes everything older than the window, and arms when
/// the retained count reaches the threshold while the channel is out of
/// cooldown. On arming, `last_action_ms` is advanced to `now_ms` before the
/// caller runs the clip sequence, so further qualifying messages arriving
/// during the pre-clip delay cannot re-arm.
pub fn observe_reaction(
    channel: &str,
    state: &mut ChannelState,
    now_ms: u64,
    window_ms: u64,
    threshold: usize,
    cooldown_ms: u64,
) -> bool {
    state.reaction_times.push_back(now_ms);
    while let Some(&oldest) = state.reaction_times.front() {
        if now_ms.saturating_sub(oldest) > window_ms {
            state.reaction_times.pop_front();
        } else {
            break;
        }
    }

    let count = state.reaction_times.len();
    if count % 5 == 0 {
        debug!(channel = %channel, reactions = count, "reaction window updated");
    }

    if count >= threshold && now_ms.saturating_sub(state.last_action_ms) >= cooldown_ms {
        state.last_action_ms = now_ms;
        return true;
    }
    false
}
