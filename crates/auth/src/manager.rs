use std::{sync::Arc, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use {
    crate::{
        credential::{SharedCredential, TokenPair},
        error::{Error, Result},
        providers::RefreshProvider,
        store::CredentialStore,
        validate::{TokenValidator, Validation},
    },
    clipwatch_common::now_ms,
};

/// Fixed operator instructions emitted when every refresh path fails.
const ESCALATION_INSTRUCTIONS: &str = "\
ALL TOKEN REFRESH PROVIDERS FAILED. Manual action required:
  1. Run `clipwatch auth login` to authorize a fresh token pair, or mint
     one yourself with the chat:read chat:edit clips:edit scopes.
  2. Put the new pair in TWITCH_ACCESS_TOKEN / TWITCH_REFRESH_TOKEN (or
     replace the stored tokens.json) and restart the bot.
Chat monitoring keeps running with the stale credential until then.";

/// Timing policy for the refresh loop.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// Scheduled tick interval.
    pub interval: Duration,
    /// Refresh at startup when expiring within this margin.
    pub startup_margin: Duration,
    /// Refresh on a tick when expiring within this margin.
    pub tick_margin: Duration,
    /// Force a refresh once the pair reaches this age, regardless of the
    /// access token's expiry (bounds refresh-token age against platform
    /// rotation policy).
    pub max_refresh_age: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            startup_margin: Duration::from_secs(3 * 60 * 60),
            tick_margin: Duration::from_secs(2 * 60 * 60),
            max_refresh_age: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// Keeps the shared credential valid: validates, refreshes through the
/// configured provider chain, persists, and escalates when out of options.
pub struct CredentialManager {
    credential: SharedCredential,
    validator: TokenValidator,
    providers: Vec<Box<dyn RefreshProvider>>,
    store: CredentialStore,
    policy: RefreshPolicy,
}

impl CredentialManager {
    #[must_use]
    pub fn new(
        credential: SharedCredential,
        validator: TokenValidator,
        providers: Vec<Box<dyn RefreshProvider>>,
        store: CredentialStore,
        policy: RefreshPolicy,
    ) -> Arc<Self> {
        Arc::new(Self {
            credential,
            validator,
            providers,
            store,
            policy,
        })
    }

    #[must_use]
    pub fn credential(&self) -> SharedCredential {
        Arc::clone(&self.credential)
    }

    /// Introspect the current access token. Transport failures count as
    /// invalid, per the failure policy.
    pub async fn validate(&self) -> Validation {
        let token = {
            let cred = self.credential.read().await;
            cred.access_token.expose_secret().clone()
        };
        match self.validator.validate(&token).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "token introspection call failed, treating as invalid");
                Validation::invalid()
            },
        }
    }

    /// Startup policy: validate, refresh when invalid or expiring within
    /// the startup margin. A total refresh failure escalates and aborts
    /// startup.
    pub async fn ensure_fresh_at_startup(&self) -> Result<()> {
        let validation = self.validate().await;
        if !self.needs_refresh(&validation, self.policy.startup_margin).await {
            info!(
                expires_in_secs = ?validation.expires_in_secs,
                login = ?validation.login,
                "credential valid at startup"
            );
            return Ok(());
        }

        info!("credential invalid or expiring soon, refreshing at startup");
        self.refresh_now().await
    }

    /// Scheduled tick: validate and refresh when needed. Failures are
    /// non-fatal; the loop re-arms for the next tick.
    pub async fn tick(&self) {
        let validation = self.validate().await;
        if !self.needs_refresh(&validation, self.policy.tick_margin).await {
            info!(
                expires_in_secs = ?validation.expires_in_secs,
                "scheduled credential check: still valid"
            );
            return;
        }

        if let Err(e) = self.refresh_now().await {
            warn!(error = %e, "scheduled refresh failed, will retry next tick");
        }
    }

    /// Run the provider chain once. On success the new pair is published
    /// atomically and persisted; on total failure the escalation
    /// instructions are logged.
    pub async fn refresh_now(&self) -> Result<()> {
        let refresh_token = {
            let cred = self.credential.read().await;
            cred.refresh_token.expose_secret().clone()
        };

        for provider in &self.providers {
            match provider.refresh(&refresh_token).await {
                Ok(pair) => {
                    self.publish(pair).await;
                    info!(provider = provider.name(), "credential refreshed");
                    return Ok(());
                },
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "refresh attempt failed");
                },
            }
        }

        self.escalate();
        Err(Error::AllProvidersFailed)
    }

    /// Spawn the periodic refresh task. Cancel the token and await the
    /// handle on shutdown.
    pub fn spawn_scheduler(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.policy.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; startup already
            // validated, so skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => manager.tick().await,
                }
            }
            info!("credential refresh scheduler stopped");
        })
    }

    async fn needs_refresh(&self, validation: &Validation, margin: Duration) -> bool {
        if !validation.valid {
            return true;
        }

        if let Some(expires_in) = validation.expires_in_secs
            && expires_in < margin.as_secs()
        {
            info!(expires_in_secs = expires_in, "access token expiring within margin");
            return true;
        }

        // Absolute-age rule, independent of access-token expiry.
        let last_refresh_ms = self.credential.read().await.last_refresh_ms;
        let age_ms = now_ms().saturating_sub(last_refresh_ms);
        if age_ms >= self.policy.max_refresh_age.as_millis() as u64 {
            info!(age_days = age_ms / 86_400_000, "refresh token past maximum age, forcing refresh");
            return true;
        }

        false
    }

    async fn publish(&self, pair: TokenPair) {
        let snapshot = {
            let mut cred = self.credential.write().await;
            cred.apply(pair, now_ms());
            cred.clone()
        };

        if let Err(e) = self.store.save(&snapshot) {
            warn!(error = %e, "failed to persist refreshed credential");
        }
    }

    fn escalate(&self) {
        error!("{ESCALATION_INSTRUCTIONS}");
    }

    /// Current access token, cloned out of the shared credential.
    pub async fn access_token(&self) -> Secret<String> {
        self.credential.read().await.access_token.clone()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use {
        super::*,
        crate::credential::Credential,
        async_trait::async_trait,
    };

    struct FakeProvider {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        result: std::result::Result<(&'static str, &'static str), ()>,
    }

    #[async_trait]
    impl RefreshProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result {
                Ok((access, refresh)) => Ok(TokenPair {
                    access_token: Secret::new(access.into()),
                    refresh_token: Secret::new(refresh.into()),
                    expires_at_ms: None,
                }),
                Err(()) => Err(Error::message("provider down")),
            }
        }
    }

    fn provider(
        name: &'static str,
        result: std::result::Result<(&'static str, &'static str), ()>,
    ) -> (Box<dyn RefreshProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(FakeProvider {
                name,
                calls: Arc::clone(&calls),
                result,
            }),
            calls,
        )
    }

    fn credential(last_refresh_ms: u64) -> SharedCredential {
        Credential {
            access_token: Secret::new("old_at".into()),
            refresh_token: Secret::new("old_rt".into()),
            expires_at_ms: None,
            last_refresh_ms,
        }
        .shared()
    }

    fn manager(
        server: &mockito::Server,
        dir: &tempfile::TempDir,
        credential: SharedCredential,
        providers: Vec<Box<dyn RefreshProvider>>,
    ) -> Arc<CredentialManager> {
        CredentialManager::new(
            credential,
            TokenValidator::new(format!("{}/validate", server.url())),
            providers,
            CredentialStore::with_path(dir.path().join("tokens.json")),
            RefreshPolicy::default(),
        )
    }

    async fn mock_validate(server: &mut mockito::Server, body: &str, status: usize) {
        server
            .mock("GET", "/validate")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn near_expiry_tick_refreshes_via_primary() {
        let mut server = mockito::Server::new_async().await;
        // 1 hour remaining, tick margin is 2 hours.
        mock_validate(&mut server, r#"{"expires_in":3600}"#, 200).await;
        let dir = tempfile::tempdir().unwrap();

        let (primary, primary_calls) = provider("oauth", Ok(("new_at", "new_rt")));
        let (secondary, secondary_calls) = provider("relay", Ok(("x", "y")));
        let cred = credential(now_ms());
        let mgr = manager(&server, &dir, Arc::clone(&cred), vec![primary, secondary]);

        mgr.tick().await;

        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
        let snapshot = cred.read().await.clone();
        assert_eq!(snapshot.access_token.expose_secret(), "new_at");
        assert_eq!(snapshot.refresh_token.expose_secret(), "new_rt");
    }

    #[tokio::test]
    async fn primary_failure_falls_back_to_secondary() {
        let mut server = mockito::Server::new_async().await;
        mock_validate(&mut server, r#"{"status":401,"message":"invalid"}"#, 401).await;
        let dir = tempfile::tempdir().unwrap();

        let (primary, primary_calls) = provider("oauth", Err(()));
        let (secondary, secondary_calls) = provider("relay", Ok(("relay_at", "relay_rt")));
        let cred = credential(now_ms());
        let mgr = manager(&server, &dir, Arc::clone(&cred), vec![primary, secondary]);

        mgr.tick().await;

        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
        let snapshot = cred.read().await.clone();
        // Both halves of the pair come from the same provider response.
        assert_eq!(snapshot.access_token.expose_secret(), "relay_at");
        assert_eq!(snapshot.refresh_token.expose_secret(), "relay_rt");
    }

    #[tokio::test]
    async fn all_providers_failing_does_not_crash_tick() {
        let mut server = mockito::Server::new_async().await;
        mock_validate(&mut server, r#"{"status":401,"message":"invalid"}"#, 401).await;
        let dir = tempfile::tempdir().unwrap();

        let (primary, _) = provider("oauth", Err(()));
        let (secondary, _) = provider("relay", Err(()));
        let cred = credential(now_ms());
        let mgr = manager(&server, &dir, Arc::clone(&cred), vec![primary, secondary]);

        // Must not panic; credential stays untouched.
        mgr.tick().await;
        let snapshot = cred.read().await.clone();
        assert_eq!(snapshot.access_token.expose_secret(), "old_at");
    }

    #[tokio::test]
    async fn startup_aborts_when_all_providers_fail() {
        let mut server = mockito::Server::new_async().await;
        mock_validate(&mut server, r#"{"status":401,"message":"invalid"}"#, 401).await;
        let dir = tempfile::tempdir().unwrap();

        let (primary, _) = provider("oauth", Err(()));
        let mgr = manager(&server, &dir, credential(now_ms()), vec![primary]);

        let err = mgr.ensure_fresh_at_startup().await.unwrap_err();
        assert!(matches!(err, Error::AllProvidersFailed));
    }

    #[tokio::test]
    async fn startup_skips_refresh_when_fresh() {
        let mut server = mockito::Server::new_async().await;
        // 10 days remaining, far beyond the 3 hour startup margin.
        mock_validate(&mut server, r#"{"expires_in":864000,"login":"goocrew"}"#, 200).await;
        let dir = tempfile::tempdir().unwrap();

        let (primary, primary_calls) = provider("oauth", Ok(("a", "b")));
        let mgr = manager(&server, &dir, credential(now_ms()), vec![primary]);

        mgr.ensure_fresh_at_startup().await.unwrap();
        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn old_pair_forces_refresh_despite_valid_token() {
        let mut server = mockito::Server::new_async().await;
        mock_validate(&mut server, r#"{"expires_in":864000}"#, 200).await;
        let dir = tempfile::tempdir().unwrap();

        let (primary, primary_calls) = provider("oauth", Ok(("fresh_at", "fresh_rt")));
        // Pair last refreshed 31 days ago.
        let thirty_one_days_ms = 31 * 24 * 60 * 60 * 1000;
        let cred = credential(now_ms().saturating_sub(thirty_one_days_ms));
        let mgr = manager(&server, &dir, Arc::clone(&cred), vec![primary]);

        mgr.tick().await;
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_persists_to_store() {
        let mut server = mockito::Server::new_async().await;
        mock_validate(&mut server, r#"{"status":401,"message":"invalid"}"#, 401).await;
        let dir = tempfile::tempdir().unwrap();

        let (primary, _) = provider("oauth", Ok(("stored_at", "stored_rt")));
        let store = CredentialStore::with_path(dir.path().join("tokens.json"));
        let mgr = CredentialManager::new(
            credential(now_ms()),
            TokenValidator::new(format!("{}/validate", server.url())),
            vec![primary],
            store.clone(),
            RefreshPolicy::default(),
        );

        mgr.refresh_now().await.unwrap();
        let persisted = store.load().unwrap();
        assert_eq!(persisted.access_token.expose_secret(), "stored_at");
    }

    #[tokio::test]
    async fn scheduler_stops_on_cancel() {
        let mut server = mockito::Server::new_async().await;
        mock_validate(&mut server, r#"{"expires_in":864000}"#, 200).await;
        let dir = tempfile::tempdir().unwrap();

        let (primary, _) = provider("oauth", Ok(("a", "b")));
        let mgr = manager(&server, &dir, credential(now_ms()), vec![primary]);

        let cancel = CancellationToken::new();
        let handle = mgr.spawn_scheduler(cancel.clone());
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
