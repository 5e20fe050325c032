use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::{
    credential::Credential,
    error::{Context, Result},
};

/// File-based credential storage at `~/.config/clipwatch/tokens.json`.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        let path = config_dir().join("tokens.json");
        Self { path }
    }

    /// Create a store at a specific path (useful for testing).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn load(&self) -> Option<Credential> {
        let path = self.path.display().to_string();
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "token file not found");
                return None;
            },
            Err(e) => {
                warn!(path = %path, error = %e, "token file read failed");
                return None;
            },
        };

        match serde_json::from_str(&data) {
            Ok(cred) => {
                debug!(path = %path, "stored credential loaded");
                Some(cred)
            },
            Err(e) => {
                warn!(path = %path, error = %e, "token file parse failed");
                None
            },
        }
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let data = serde_json::to_string_pretty(credential)?;
        std::fs::write(&self.path, &data)
            .with_context(|| format!("writing {}", self.path.display()))?;

        // Tokens are secrets; keep the file owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %self.path.display(), "credential saved");
        Ok(())
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

/// User-global config directory (`~/.config/clipwatch/`), falling back to
/// the working directory when the home directory cannot be determined.
fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "clipwatch")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
