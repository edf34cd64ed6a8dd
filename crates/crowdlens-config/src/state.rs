// On-disk client state: auth token, selected site, user email.
//
// Kept in `state.toml` under the data directory and rewritten on every
// change. The file holds a bearer token, so it is created owner-only.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crowdlens_core::{ClientState, CoreError};

use crate::ConfigError;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StateFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    site_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_email: Option<String>,
}

/// [`ClientState`] persisted as TOML.
#[derive(Debug)]
pub struct FileClientState {
    path: PathBuf,
    values: RwLock<StateFile>,
}

impl FileClientState {
    /// State at the canonical location.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(crate::state_path())
    }

    /// Load `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateFile::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "client state loaded");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, StateFile> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateFile> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` and write the result through to disk.
    fn update(&self, change: impl FnOnce(&mut StateFile)) -> Result<(), CoreError> {
        let mut values = self.write();
        let mut next = values.clone();
        change(&mut next);
        if next == *values {
            return Ok(());
        }
        persist(&self.path, &next).map_err(|e| {
            warn!(error = %e, path = %self.path.display(), "could not save client state");
            CoreError::Config {
                message: e.to_string(),
            }
        })?;
        *values = next;
        Ok(())
    }
}

fn persist(path: &Path, values: &StateFile) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(values)?;
    let mut file = open_owner_only(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// Truncate-or-create `path` readable by the owner only, before any byte of
/// the token is written.
#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl ClientState for FileClientState {
    fn auth_token(&self) -> Option<SecretString> {
        self.read().auth_token.clone().map(SecretString::from)
    }

    fn set_auth_token(&self, token: Option<SecretString>) -> Result<(), CoreError> {
        let token = token.map(|t| t.expose_secret().to_owned());
        self.update(|s| s.auth_token = token)
    }

    fn site_id(&self) -> Option<String> {
        self.read().site_id.clone()
    }

    fn set_site_id(&self, site_id: Option<&str>) -> Result<(), CoreError> {
        self.update(|s| s.site_id = site_id.map(str::to_owned))
    }

    fn user_email(&self) -> Option<String> {
        self.read().user_email.clone()
    }

    fn set_user_email(&self, email: Option<&str>) -> Result<(), CoreError> {
        self.update(|s| s.user_email = email.map(str::to_owned))
    }

    fn clear_all(&self) -> Result<(), CoreError> {
        self.update(|s| *s = StateFile::default())
    }
}
