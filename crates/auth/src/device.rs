use {
    secrecy::Secret,
    serde::Deserialize,
    tracing::{debug, info},
};

use {
    crate::{
        credential::TokenPair,
        error::{Error, Result},
    },
    clipwatch_common::now_ms,
};

/// Response from the device code request.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn default_interval() -> u64 {
    5
}

#[derive(Deserialize)]
struct TokenPollResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    /// Twitch reports pending/denied states in `message`.
    message: Option<String>,
}

/// Interactive first-run authorization via the OAuth device-code flow.
///
/// Used by `clipwatch auth login` when no stored credential exists yet; the
/// operator visits the verification URI while we poll the token endpoint.
pub struct DeviceFlow {
    client: reqwest::Client,
    device_url: String,
    token_url: String,
    client_id: String,
    scopes: String,
}

impl DeviceFlow {
    #[must_use]
    pub fn new(
        device_url: impl Into<String>,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        scopes: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            device_url: device_url.into(),
            token_url: token_url.into(),
            client_id: client_id.into(),
            scopes: scopes.into(),
        }
    }

    /// Request a device code and the verification URI to show the operator.
    pub async fn request_code(&self) -> Result<DeviceCodeResponse> {
        let response = self
            .client
            .post(&self.device_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scopes", self.scopes.as_str()),
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

        let code: DeviceCodeResponse = response.json().await?;
        info!(
            verification_uri = %code.verification_uri,
            user_code = %code.user_code,
            "device authorization requested"
        );
        Ok(code)
    }

    /// Poll the token endpoint until the operator completes authorization.
    pub async fn poll(&self, code: &DeviceCodeResponse) -> Result<TokenPair> {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(code.interval)).await;

            let response = self
                .client
                .post(&self.token_url)
                .form(&[
                    ("client_id", self.client_id.as_str()),
                    ("scopes", self.scopes.as_str()),
                    ("device_code", code.device_code.as_str()),
                    (
                        "grant_type",
                        "urn:ietf:params:oauth:grant-type:device_code",
                    ),
                ])
                .send()
                .await?;

            let body: TokenPollResponse = response.json().await?;

            if let (Some(access), Some(refresh)) = (body.access_token, body.refresh_token) {
                return Ok(TokenPair {
                    access_token: Secret::new(access),
                    refresh_token: Secret::new(refresh),
                    expires_at_ms: body
                        .expires_in
                        .map(|secs| now_ms().saturating_add(secs.saturating_mul(1000))),
                });
            }

            match body.message.as_deref() {
                Some("authorization_pending") => {
                    debug!("device authorization still pending");
                    continue;
                },
                Some(other) => return Err(Error::DeviceFlow(other.to_string())),
                None => {
                    return Err(Error::DeviceFlow(
                        "unexpected response from token endpoint".into(),
                    ));
                },
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    fn flow(server: &mockito::Server) -> DeviceFlow {
        DeviceFlow::new(
            format!("{}/device", server.url()),
            format!("{}/token", server.url()),
            "cid",
            "chat:read",
        )
    }

    fn code(interval: u64) -> DeviceCodeResponse {
        DeviceCodeResponse {
            device_code: "dc".into(),
            user_code: "ABCD-1234".into(),
            verification_uri: "https://www.twitch.tv/activate".into(),
            interval,
            expires_in: Some(1800),
        }
    }

    #[test]
    fn device_code_default_interval() {
        let json = r#"{
            "device_code": "dc",
            "user_code": "CODE",
            "verification_uri": "https://www.twitch.tv/activate"
        }"#;
        let resp: DeviceCodeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.interval, 5);
    }

    #[tokio::test]
    async fn request_code_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/device")
            .with_status(200)
            .with_body(
                r#"{"device_code":"dc1","user_code":"WXYZ","verification_uri":"https://www.twitch.tv/activate","interval":1,"expires_in":1800}"#,
            )
            .create_async()
            .await;

        let resp = flow(&server).request_code().await.unwrap();
        assert_eq!(resp.device_code, "dc1");
        assert_eq!(resp.user_code, "WXYZ");
    }

    #[tokio::test]
    async fn poll_pending_then_granted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"status":400,"message":"authorization_pending"}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"at","refresh_token":"rt","expires_in":3600}"#)
            .create_async()
            .await;

        let pair = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            flow(&server).poll(&code(0)),
        )
        .await
        .expect("timed out")
        .unwrap();
        assert_eq!(pair.access_token.expose_secret(), "at");
        assert_eq!(pair.refresh_token.expose_secret(), "rt");
    }

    #[tokio::test]
    async fn poll_denied_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"status":400,"message":"access_denied"}"#)
            .create_async()
            .await;

        let err = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            flow(&server).poll(&code(0)),
        )
        .await
        .expect("timed out")
        .unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }
}
