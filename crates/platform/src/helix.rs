use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    secrecy::ExposeSecret,
    serde::Deserialize,
    tracing::debug,
};

use {
    crate::{
        api::{ClipId, PlatformApi},
        error::{Error, Result},
    },
    clipwatch_auth::SharedCredential,
};

/// Helix HTTP client. Reads the shared credential per request, so a
/// refreshed token pair is picked up by the next call without any
/// re-wiring.
pub struct HelixClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    credential: SharedCredential,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct UserEntry {
    id: String,
}

#[derive(Deserialize)]
struct StreamEntry {
    started_at: String,
}

#[derive(Deserialize)]
struct ClipEntry {
    id: String,
}

impl HelixClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>, credential: SharedCredential) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            client_id: client_id.into(),
            credential,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<DataEnvelope<T>> {
        let token = self.bearer().await;
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .header("Authorization", format!("Bearer {token}"))
            .header("Client-Id", &self.client_id)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<DataEnvelope<T>> {
        let token = self.bearer().await;
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .query(query)
            .header("Authorization", format!("Bearer {token}"))
            .header("Client-Id", &self.client_id)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<DataEnvelope<T>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn bearer(&self) -> String {
        self.credential
            .read()
            .await
            .access_token
            .expose_secret()
            .clone()
    }
}

#[async_trait]
impl PlatformApi for HelixClient {
    async fn get_user_id(&self, login: &str) -> Result<String> {
        let envelope: DataEnvelope<UserEntry> = self.get("/users", &[("login", login)]).await?;
        envelope
            .data
            .into_iter()
            .next()
            .map(|u| u.id)
            .ok_or_else(|| Error::UnknownUser {
                login: login.to_string(),
            })
    }

    async fn is_live(&self, user_id: &str) -> Result<bool> {
        let envelope: DataEnvelope<StreamEntry> =
            self.get("/streams", &[("user_id", user_id)]).await?;
        Ok(!envelope.data.is_empty())
    }

    async fn stream_start_time(&self, user_id: &str) -> Result<Option<DateTime<Utc>>> {
        let envelope: DataEnvelope<StreamEntry> =
            self.get("/streams", &[("user_id", user_id)]).await?;
        let Some(stream) = envelope.data.into_iter().next() else {
            return Ok(None);
        };
        let started_at = DateTime::parse_from_rfc3339(&stream.started_at)
            .map_err(|_| Error::BadTimestamp {
                value: stream.started_at.clone(),
            })?
            .with_timezone(&Utc);
        Ok(Some(started_at))
    }

    async fn create_clip(&self, user_id: &str) -> Result<ClipId> {
        // has_delay shifts the capture window slightly backward so the clip
        // includes the moment that triggered it.
        let envelope: DataEnvelope<ClipEntry> = self
            .post("/clips", &[("broadcaster_id", user_id), ("has_delay", "true")])
            .await?;
        let clip = envelope.data.into_iter().next().ok_or(Error::MissingClipId)?;
        debug!(clip_id = %clip.id, "clip created");
        Ok(ClipId::new(clip.id))
    }
}
