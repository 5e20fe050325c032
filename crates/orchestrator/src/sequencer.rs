use {
    std::{sync::Arc, time::Duration},
    chrono::Utc,
    tokio::sync::Mutex,
    tracing::{info, warn},
};

use {
    crate::state::ChannelState,
    clipwatch_chat::ChatTransport,
    clipwatch_platform::{PlatformApi, clip_url},
};

/// Fixed wait between the live check and clip creation, so the clip captures
/// the moment that triggered it. Deliberately not configurable.
pub const ACTION_DELAY: Duration = Duration::from_secs(5);

/// After a failed clip attempt the channel becomes eligible again this long
/// after arming, instead of waiting out the full cooldown.
const FAILURE_GRACE_MS: u64 = 30_000;

/// Everything one armed clip attempt needs, cloned out of the engine so the
/// attempt runs as its own task without blocking message ingestion.
pub(crate) struct ActionContext {
    pub channel: String,
    pub state: Arc<Mutex<ChannelState>>,
    pub chat: Arc<dyn ChatTransport>,
    pub platform: Arc<dyn PlatformApi>,
    pub cooldown_ms: u64,
}

/// Run one armed clip attempt: live gate, fixed delay, clip creation,
/// then state/cooldown bookkeeping per outcome. Never returns an error;
/// every failure is converted into a cooldown decision here.
pub(crate) async fn run_action(ctx: ActionContext, armed_at_ms: u64) {
    let user_id = match ctx.platform.get_user_id(&ctx.channel).await {
        Ok(id) => id,
        Err(e) => {
            warn!(channel = %ctx.channel, error = %e, "user lookup failed, abandoning clip attempt");
            return;
        }
    };

    match ctx.platform.is_live(&user_id).await {
        Ok(true) => {}
        Ok(false) => {
            // Cooldown was already started at arming time, so an offline
            // channel is not re-checked by the rest of this burst.
            info!(channel = %ctx.channel, "channel is offline, abandoning clip attempt");
            return;
        }
        Err(e) => {
            warn!(channel = %ctx.channel, error = %e, "live check failed, abandoning clip attempt");
            return;
        }
    }

    tokio::time::sleep(ACTION_DELAY).await;

    let uptime = uptime_label(ctx.platform.as_ref(), &ctx.channel, &user_id).await;

    match ctx.platform.create_clip(&user_id).await {
        Ok(clip) => {
            let silenced = {
                let mut state = ctx.state.lock().await;
                state.reaction_times.clear();
                state.silenced
            };
            let url = clip_url(&clip);
            info!(channel = %ctx.channel, clip_id = %clip, uptime = %uptime, "clip created");
            if !silenced {
                let text =
                    format!("Clip created at {uptime} into the stream! Watch it here: {url}");
                if let Err(e) = ctx.chat.send(&ctx.channel, &text).await {
                    warn!(channel = %ctx.channel, error = %e, "failed to announce clip");
                }
            }
        }
        Err(e) => {
            warn!(channel = %ctx.channel, error = %e, "clip creation failed, shortening cooldown");
            let mut state = ctx.state.lock().await;
            state.last_action_ms =
                (armed_at_ms + FAILURE_GRACE_MS).saturating_sub(ctx.cooldown_ms);
        }
    }
}

/// `HH:MM:SS` since stream start, or `Unknown` when the stream info is
/// missing or unreadable.
async fn uptime_label(platform: &dyn PlatformApi, channel: &str, user_id: &str) -> String {
    match platform.stream_start_time(user_id).await {
        Ok(Some(started_at)) => {
            let total = (Utc::now() - started_at).num_seconds().max(0) as u64;
            format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
        }
        Ok(None) => "Unknown".to_string(),
        Err(e) => {
            warn!(channel = %channel, error = %e, "uptime lookup failed");
            "Unknown".to_string()
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        chrono::{DateTime, Utc},
        clipwatch_chat::{self as chat},
        clipwatch_platform::{self as platform, ClipId},
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    const COOLDOWN_MS: u64 = 60_000;
    const T0: u64 = 1_700_000_000_000;

    struct FakePlatform {
        live: bool,
        fail_clip: bool,
        started_at: Option<DateTime<Utc>>,
        clip_calls: AtomicUsize,
        live_calls: AtomicUsize,
    }

    impl FakePlatform {
        fn live() -> Self {
            Self {
                live: true,
                fail_clip: false,
                started_at: Some(Utc::now() - chrono::Duration::seconds(3723)),
                clip_calls: AtomicUsize::new(0),
                live_calls: AtomicUsize::new(0),
            }
        }

        fn offline() -> Self {
            Self { live: false, ..Self::live() }
        }

        fn failing_clip() -> Self {
            Self { fail_clip: true, ..Self::live() }
        }
    }

    #[async_trait]
    impl PlatformApi for FakePlatform {
        async fn get_user_id(&self, _login: &str) -> platform::Result<String> {
            Ok("1234".into())
        }

        async fn is_live(&self, _user_id: &str) -> platform::Result<bool> {
            self.live_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.live)
        }

        async fn stream_start_time(
            &self,
            _user_id: &str,
        ) -> platform::Result<Option<DateTime<Utc>>> {
            Ok(self.started_at)
        }

        async fn create_clip(&self, _user_id: &str) -> platform::Result<ClipId> {
            self.clip_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_clip {
                return Err(platform::Error::MissingClipId);
            }
            Ok(ClipId::new("TestClipSlug"))
        }
    }

    struct FakeChat {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl FakeChat {
        fn new() -> Self {
            Self { sent: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ChatTransport for FakeChat {
        async fn join(&self, _channel: &str) -> chat::Result<()> {
            Ok(())
        }

        async fn send(&self, channel: &str, text: &str) -> chat::Result<()> {
            self.sent.lock().await.push((channel.into(), text.into()));
            Ok(())
        }
    }

    fn armed_state() -> Arc<Mutex<ChannelState>> {
        let mut state = ChannelState::new(T0, COOLDOWN_MS, false);
        state.reaction_times.extend([T0 - 10_000, T0 - 5_000, T0]);
        state.last_action_ms = T0;
        Arc::new(Mutex::new(state))
    }

    fn context(
        platform: Arc<FakePlatform>,
        chat: Arc<FakeChat>,
        state: Arc<Mutex<ChannelState>>,
    ) -> ActionContext {
        ActionContext {
            channel: "goocrew".into(),
            state,
            chat,
            platform,
            cooldown_ms: COOLDOWN_MS,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn successful_clip_clears_window_and_announces() {
        let platform = Arc::new(FakePlatform::live());
        let chat = Arc::new(FakeChat::new());
        let state = armed_state();

        run_action(context(Arc::clone(&platform), Arc::clone(&chat), Arc::clone(&state)), T0).await;

        assert_eq!(platform.clip_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.lock().await.reaction_count(), 0);
        let sent = chat.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "goocrew");
        assert!(sent[0].1.contains("Clip created at 01:02:"));
        assert!(sent[0].1.contains("https://clips.twitch.tv/TestClipSlug"));
    }

    #[tokio::test(start_paused = true)]
    async fn offline_channel_skips_clip_and_keeps_cooldown() {
        let platform = Arc::new(FakePlatform::offline());
        let chat = Arc::new(FakeChat::new());
        let state = armed_state();

        run_action(context(Arc::clone(&platform), Arc::clone(&chat), Arc::clone(&state)), T0).await;

        assert_eq!(platform.live_calls.load(Ordering::SeqCst), 1);
        assert_eq!(platform.clip_calls.load(Ordering::SeqCst), 0);
        let state = state.lock().await;
        // Cooldown marker from arming time survives the abandoned attempt.
        assert_eq!(state.last_action_ms, T0);
        assert_eq!(state.reaction_count(), 3);
        assert!(chat.sent.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_clip_keeps_window_and_shortens_cooldown() {
        let platform = Arc::new(FakePlatform::failing_clip());
        let chat = Arc::new(FakeChat::new());
        let state = armed_state();

        run_action(context(Arc::clone(&platform), Arc::clone(&chat), Arc::clone(&state)), T0).await;

        let state = state.lock().await;
        assert_eq!(state.reaction_count(), 3);
        // Eligible again exactly 30s after arming.
        assert_eq!(state.last_action_ms, T0 + 30_000 - COOLDOWN_MS);
        assert!(chat.sent.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn silenced_channel_clips_without_announcing() {
        let platform = Arc::new(FakePlatform::live());
        let chat = Arc::new(FakeChat::new());
        let state = armed_state();
        state.lock().await.silenced = true;

        run_action(context(Arc::clone(&platform), Arc::clone(&chat), Arc::clone(&state)), T0).await;

        assert_eq!(platform.clip_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.lock().await.reaction_count(), 0);
        assert!(chat.sent.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_stream_info_reports_unknown_uptime() {
        let platform = Arc::new(FakePlatform {
            started_at: None,
            ..FakePlatform::live()
        });
        let chat = Arc::new(FakeChat::new());
        let state = armed_state();

        run_action(context(platform, Arc::clone(&chat), state), T0).await;

        let sent = chat.sent.lock().await;
        assert!(sent[0].1.contains("Clip created at Unknown into the stream!"));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_runs_only_on_the_live_path() {
        let start = tokio::time::Instant::now();
        let platform = Arc::new(FakePlatform::offline());
        let chat = Arc::new(FakeChat::new());
        run_action(context(platform, chat, armed_state()), T0).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        let start = tokio::time::Instant::now();
        let platform = Arc::new(FakePlatform::live());
        let chat = Arc::new(FakeChat::new());
        run_action(context(platform, chat, armed_state()), T0).await;
        assert_eq!(start.elapsed(), ACTION_DELAY);
    }
}
