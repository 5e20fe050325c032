use {serde::Deserialize, tracing::debug};

use crate::error::Result;

/// Result of a token introspection call.
#[derive(Debug, Clone)]
pub struct Validation {
    pub valid: bool,
    /// Seconds until the access token expires, when the endpoint reports it.
    pub expires_in_secs: Option<u64>,
    /// Login the token was minted for, when valid.
    pub login: Option<String>,
}

impl Validation {
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            valid: false,
            expires_in_secs: None,
            login: None,
        }
    }
}

#[derive(Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    login: Option<String>,
}

/// Client for the platform's token introspection endpoint.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    client: reqwest::Client,
    validate_url: String,
}

impl TokenValidator {
    #[must_use]
    pub fn new(validate_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            validate_url: validate_url.into(),
        }
    }

    /// Introspect an access token. A non-success response means the token is
    /// invalid; only transport failures surface as errors (and callers treat
    /// those as failed attempts, never as crashes).
    pub async fn validate(&self, access_token: &str) -> Result<Validation> {
        let response = self
            .client
            .get(&self.validate_url)
            .header("Authorization", format!("OAuth {access_token}"))
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "token introspection rejected the token");
            return Ok(Validation::invalid());
        }

        let body: ValidateResponse = response.json().await?;
        Ok(Validation {
            valid: true,
            expires_in_secs: body.expires_in,
            login: body.login,
        })
    }
}
