use {
    std::{collections::HashMap, sync::Arc},
    async_trait::async_trait,
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use {
    crate::{
        detector::observe_reaction,
        router::{Route, classify},
        sequencer::{ActionContext, run_action},
        state::ChannelState,
    },
    clipwatch_chat::{self as chat, ChatTransport, InboundMessage, MessageHandler},
    clipwatch_common::{now_ms, secs_to_ms},
    clipwatch_config::Config,
    clipwatch_platform::PlatformApi,
};

/// One-time acknowledgement sent when a channel is silenced.
const SILENCE_NOTICE: &str = "I'll be quiet until I'm restarted, but I'll still create clips!";

/// Owns all per-channel state and wires the router, detector and sequencer
/// together. Implements [`MessageHandler`] so the chat transport can deliver
/// straight into it.
pub struct Orchestrator {
    config: Arc<Config>,
    channels: HashMap<String, Arc<Mutex<ChannelState>>>,
    chat: Arc<dyn ChatTransport>,
    platform: Arc<dyn PlatformApi>,
    window_ms: u64,
    cooldown_ms: u64,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        chat: Arc<dyn ChatTransport>,
        platform: Arc<dyn PlatformApi>,
        startup_now_ms: u64,
    ) -> Self {
        let cooldown_ms = secs_to_ms(config.cooldown_secs);
        let channels = config
            .monitored_channels()
            .into_iter()
            .map(|channel| {
                let silenced = config.is_silent(&channel);
                let state = ChannelState::new(startup_now_ms, cooldown_ms, silenced);
                (channel, Arc::new(Mutex::new(state)))
            })
            .collect();
        Self {
            window_ms: secs_to_ms(config.reaction_window_secs),
            cooldown_ms,
            config,
            channels,
            chat,
            platform,
        }
    }

    /// Join every monitored channel on the transport.
    pub async fn join_all(&self) -> chat::Result<()> {
        for channel in self.channels.keys() {
            self.chat.join(channel).await?;
            info!(channel = %channel, "joined channel");
        }
        Ok(())
    }

    /// Count one reaction; spawn the clip sequence when the burst arms.
    /// The spawned attempt runs independently so a slow platform call on
    /// one channel never stalls message handling for the others.
    pub async fn handle_reaction(&self, channel: &str, now_ms: u64) {
        let Some(state) = self.channels.get(channel) else {
            return;
        };
        let armed = {
            let mut state = state.lock().await;
            observe_reaction(
                channel,
                &mut state,
                now_ms,
                self.window_ms,
                self.config.reaction_threshold,
                self.cooldown_ms,
            )
        };
        if armed {
            info!(channel = %channel, "reaction burst detected, arming clip attempt");
            let ctx = ActionContext {
                channel: channel.to_string(),
                state: Arc::clone(state),
                chat: Arc::clone(&self.chat),
                platform: Arc::clone(&self.platform),
                cooldown_ms: self.cooldown_ms,
            };
            tokio::spawn(run_action(ctx, now_ms));
        }
    }

    /// One-way silence transition; the notice goes out only on the first
    /// transition.
    pub async fn handle_silence(&self, channel: &str) {
        let Some(state) = self.channels.get(channel) else {
            return;
        };
        let first_transition = {
            let mut state = state.lock().await;
            let first = !state.silenced;
            state.silenced = true;
            first
        };
        if first_transition {
            info!(channel = %channel, "channel silenced until restart");
            if let Err(e) = self.chat.send(channel, SILENCE_NOTICE).await {
                warn!(channel = %channel, error = %e, "failed to send silence notice");
            }
        } else {
            debug!(channel = %channel, "silence command on already-silenced channel");
        }
    }
}

#[async_trait]
impl MessageHandler for Orchestrator {
    async fn on_message(&self, message: InboundMessage) {
        match classify(&message, &self.config.keywords) {
            Route::Silence => self.handle_silence(&message.channel).await,
            Route::Reaction => self.handle_reaction(&message.channel, now_ms()).await,
            Route::Ignore => {}
        }
    }
}
