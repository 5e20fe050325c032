use std::sync::Arc;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tokio::sync::RwLock,
};

/// The process-wide OAuth credential.
///
/// Shared by every outbound collaborator (chat transport, platform API) but
/// mutated only by the [`crate::CredentialManager`], which replaces both
/// tokens under a single write lock so readers never observe a half-updated
/// pair.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: Secret<String>,
    #[serde(serialize_with = "serialize_secret")]
    pub refresh_token: Secret<String>,
    /// Unix ms when the access token expires, when known.
    pub expires_at_ms: Option<u64>,
    /// Unix ms of the last successful refresh (any provider). Monotonically
    /// non-decreasing.
    pub last_refresh_ms: u64,
}

/// Shared handle: readers clone token values per request, the lifecycle
/// manager is the single writer.
pub type SharedCredential = Arc<RwLock<Credential>>;

/// A freshly minted token pair from a refresh provider or the device flow.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
    pub expires_at_ms: Option<u64>,
}

impl Credential {
    #[must_use]
    pub fn new(pair: TokenPair, now_ms: u64) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_at_ms: pair.expires_at_ms,
            last_refresh_ms: now_ms,
        }
    }

    /// Replace both tokens with a new pair. `last_refresh_ms` never moves
    /// backwards even if the caller's clock does.
    pub fn apply(&mut self, pair: TokenPair, now_ms: u64) {
        self.access_token = pair.access_token;
        self.refresh_token = pair.refresh_token;
        self.expires_at_ms = pair.expires_at_ms;
        self.last_refresh_ms = self.last_refresh_ms.max(now_ms);
    }

    #[must_use]
    pub fn shared(self) -> SharedCredential {
        Arc::new(RwLock::new(self))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at_ms", &self.expires_at_ms)
            .field("last_refresh_ms", &self.last_refresh_ms)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
