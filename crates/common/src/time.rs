use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as unix milliseconds.
///
/// All window/cooldown arithmetic in the orchestrator and the credential
/// manager runs on these values so tests can drive logic with explicit
/// timestamps instead of sleeping.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Seconds → milliseconds, saturating.
#[must_use]
pub const fn secs_to_ms(secs: u64) -> u64 {
    secs.saturating_mul(1000)
}
