use {
    std::sync::Arc,
    anyhow::Context,
    tokio_util::sync::CancellationToken,
    tracing::{error, info},
};

use {
    clipwatch_auth::{
        Credential, CredentialManager, CredentialStore, OAuthRefreshProvider, RefreshPolicy,
        RefreshProvider, RelayRefreshProvider, TOKEN_URL, TokenPair, TokenValidator, VALIDATE_URL,
    },
    clipwatch_chat::{ChatTransport, IRC_WS_URL, IrcTransport, MessageHandler},
    clipwatch_common::now_ms,
    clipwatch_config::Config,
    clipwatch_orchestrator::Orchestrator,
    clipwatch_platform::{HELIX_URL, HelixClient, PlatformApi},
};

/// Start the bot and run until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let config = clipwatch_config::load_from_env()?;
    clipwatch_config::validate(&config)?;
    let config = Arc::new(config);

    let store = CredentialStore::new();
    let credential = load_credential(&store, &config)?.shared();
    let manager = build_manager(&config, Arc::clone(&credential), store);

    manager
        .ensure_fresh_at_startup()
        .await
        .context("credential could not be made valid at startup")?;

    // The IRC nick must match the account the token belongs to.
    let login = manager
        .validate()
        .await
        .login
        .context("token introspection did not report a login")?;

    let platform: Arc<dyn PlatformApi> = Arc::new(HelixClient::new(
        HELIX_URL,
        config.client_id.clone(),
        Arc::clone(&credential),
    ));
    let transport = Arc::new(IrcTransport::new(IRC_WS_URL, login, Arc::clone(&credential)));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&config),
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
        platform,
        now_ms(),
    ));
    orchestrator.join_all().await?;

    let cancel = CancellationToken::new();
    let scheduler = manager.spawn_scheduler(cancel.clone());
    let chat_task = tokio::spawn(
        Arc::clone(&transport).run(orchestrator as Arc<dyn MessageHandler>, cancel.clone()),
    );

    info!("clipwatch running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    cancel.cancel();
    scheduler.await.context("refresh scheduler panicked")?;
    match chat_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "chat transport exited with an error"),
        Err(e) => error!(error = %e, "chat transport task panicked"),
    }
    Ok(())
}

/// Stored credential wins; the environment pair only seeds a first run.
/// Having neither is a fatal startup condition.
pub(crate) fn load_credential(
    store: &CredentialStore,
    config: &Config,
) -> anyhow::Result<Credential> {
    if let Some(stored) = store.load() {
        info!(path = %store.path().display(), "using stored credential");
        return Ok(stored);
    }

    match (&config.access_token, &config.refresh_token) {
        (Some(access), Some(refresh)) => {
            info!("seeding credential from environment");
            Ok(Credential::new(
                TokenPair {
                    access_token: access.clone(),
                    refresh_token: refresh.clone(),
                    expires_at_ms: None,
                },
                now_ms(),
            ))
        }
        _ => anyhow::bail!(
            "no credential available: run `clipwatch auth login` or set \
             TWITCH_ACCESS_TOKEN and TWITCH_REFRESH_TOKEN"
        ),
    }
}

/// Provider chain is configuration-driven: the native OAuth grant always
/// comes first, the relay joins as a fallback when a relay URL is set.
pub(crate) fn build_manager(
    config: &Config,
    credential: clipwatch_auth::SharedCredential,
    store: CredentialStore,
) -> Arc<CredentialManager> {
    let mut providers: Vec<Box<dyn RefreshProvider>> = vec![Box::new(OAuthRefreshProvider::new(
        TOKEN_URL,
        config.client_id.clone(),
        config.client_secret.clone(),
    ))];
    if let Some(relay) = &config.refresh_relay_url {
        providers.push(Box::new(RelayRefreshProvider::new(relay.clone())));
    }

    CredentialManager::new(
        credential,
        TokenValidator::new(VALIDATE_URL),
        providers,
        store,
        RefreshPolicy::default(),
    )
}
