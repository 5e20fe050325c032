use {
    anyhow::{Context, Result},
    clap::Subcommand,
    secrecy::ExposeSecret,
};

use {
    clipwatch_auth::{Credential, CredentialStore, DEVICE_URL, DeviceFlow, SCOPES, TOKEN_URL,
        TokenValidator, VALIDATE_URL},
    clipwatch_common::now_ms,
};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Authorize the bot account via the device-code flow and store the
    /// resulting token pair.
    Login,
    /// Validate the stored credential and print its status.
    Status,
    /// Run the refresh provider chain once, right now.
    Refresh,
}

pub async fn handle_auth(action: AuthAction) -> Result<()> {
    match action {
        AuthAction::Login => login().await,
        AuthAction::Status => status().await,
        AuthAction::Refresh => refresh().await,
    }
}

async fn login() -> Result<()> {
    let config = clipwatch_config::load_from_env()?;

    let flow = DeviceFlow::new(DEVICE_URL, TOKEN_URL, config.client_id.clone(), SCOPES);
    let code = flow.request_code().await?;

    println!("Visit {} and enter code: {}", code.verification_uri, code.user_code);
    println!("Waiting for authorization...");
    let pair = flow.poll(&code).await?;

    let store = CredentialStore::new();
    let credential = Credential::new(pair, now_ms());
    store.save(&credential)?;
    println!("Credential saved to {}", store.path().display());
    Ok(())
}

async fn status() -> Result<()> {
    let store = CredentialStore::new();
    let Some(credential) = store.load() else {
        println!("No stored credential. Run `clipwatch auth login`.");
        return Ok(());
    };

    let validation = TokenValidator::new(VALIDATE_URL)
        .validate(credential.access_token.expose_secret())
        .await
        .context("token introspection call failed")?;

    if validation.valid {
        println!(
            "Token valid for {} (expires in {})",
            validation.login.as_deref().unwrap_or("<unknown login>"),
            validation
                .expires_in_secs
                .map_or_else(|| "unknown".to_string(), |s| format!("{}h{}m", s / 3600, (s % 3600) / 60)),
        );
    } else {
        println!("Token is invalid or expired. Run `clipwatch auth refresh` or `clipwatch auth login`.");
    }
    Ok(())
}

async fn refresh() -> Result<()> {
    let config = clipwatch_config::load_from_env()?;
    let store = CredentialStore::new();
    let credential = crate::run::load_credential(&store, &config)?.shared();

    let manager = crate::run::build_manager(&config, credential, store);
    manager.refresh_now().await?;
    println!("Credential refreshed and saved.");
    Ok(())
}
