use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::debug,
};

use {
    crate::{
        credential::TokenPair,
        error::{Error, Result},
    },
    clipwatch_common::now_ms,
};

/// A way to exchange the current refresh token for a fresh token pair.
///
/// Providers are tried in configuration order; the first success wins. The
/// manager treats any error as a failed attempt and moves on to the next
/// provider.
#[async_trait]
pub trait RefreshProvider: Send + Sync {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;
}

// ── Primary: native OAuth refresh grant ─────────────────────────────────────

/// Refresh via the platform's own OAuth token endpoint.
pub struct OAuthRefreshProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Secret<String>,
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl OAuthRefreshProvider {
    #[must_use]
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret,
        }
    }
}

#[async_trait]
impl RefreshProvider for OAuthRefreshProvider {
    fn name(&self) -> &'static str {
        "oauth"
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let body: OAuthTokenResponse = response.json().await?;
        debug!(expires_in = ?body.expires_in, "oauth refresh grant succeeded");
        Ok(TokenPair {
            access_token: Secret::new(body.access_token),
            refresh_token: Secret::new(body.refresh_token),
            expires_at_ms: body
                .expires_in
                .map(|secs| now_ms().saturating_add(secs.saturating_mul(1000))),
        })
    }
}

// ── Secondary: third-party refresh relay ────────────────────────────────────

/// Fallback refresh via a token-refresh relay keyed by the refresh token
/// (`GET <base>/<refresh_token>`).
pub struct RelayRefreshProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RelayResponse {
    token: String,
    refresh: String,
}

impl RelayRefreshProvider {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RefreshProvider for RelayRefreshProvider {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let url = format!("{}/{refresh_token}", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let body: RelayResponse = response.json().await?;
        debug!("relay refresh succeeded");
        Ok(TokenPair {
            access_token: Secret::new(body.token),
            refresh_token: Secret::new(body.refresh),
            // The relay does not report expiry; the next validation pass
            // learns it from the introspection endpoint.
            expires_at_ms: None,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oauth_refresh_parses_pair() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "old_rt".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "cid".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"new_at","refresh_token":"new_rt","expires_in":3600}"#)
            .create_async()
            .await;

        let provider = OAuthRefreshProvider::new(
            format!("{}/token", server.url()),
            "cid",
            Secret::new("cs".into()),
        );
        let pair = provider.refresh("old_rt").await.unwrap();
        mock.assert_async().await;
        assert_eq!(pair.access_token.expose_secret(), "new_at");
        assert_eq!(pair.refresh_token.expose_secret(), "new_rt");
        assert!(pair.expires_at_ms.is_some());
    }

    #[tokio::test]
    async fn oauth_refresh_rejection_is_endpoint_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"status":400,"message":"Invalid refresh token"}"#)
            .create_async()
            .await;

        let provider = OAuthRefreshProvider::new(
            format!("{}/token", server.url()),
            "cid",
            Secret::new("cs".into()),
        );
        let err = provider.refresh("stale").await.unwrap_err();
        assert!(matches!(err, Error::Endpoint { status: 400, .. }));
    }

    #[tokio::test]
    async fn relay_refresh_parses_pair() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/refresh/old_rt")
            .with_status(200)
            .with_body(r#"{"token":"relay_at","refresh":"relay_rt"}"#)
            .create_async()
            .await;

        let provider = RelayRefreshProvider::new(format!("{}/api/refresh", server.url()));
        let pair = provider.refresh("old_rt").await.unwrap();
        mock.assert_async().await;
        assert_eq!(pair.access_token.expose_secret(), "relay_at");
        assert_eq!(pair.refresh_token.expose_secret(), "relay_rt");
        assert!(pair.expires_at_ms.is_none());
    }

    #[tokio::test]
    async fn relay_unexpected_shape_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/refresh/rt")
            .with_status(200)
            .with_body(r#"{"something":"else"}"#)
            .create_async()
            .await;

        let provider = RelayRefreshProvider::new(format!("{}/api/refresh", server.url()));
        assert!(provider.refresh("rt").await.is_err());
    }
}
