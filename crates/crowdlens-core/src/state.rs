// Durable client-side state: auth token, selected site, user email.
//
// Each value is set and cleared independently. The dashboard only sees the
// trait; `crowdlens-config` persists it to disk, `MemoryClientState` keeps it
// in process.

use std::sync::{PoisonError, RwLock};

use secrecy::SecretString;

use crate::error::CoreError;

pub trait ClientState: Send + Sync {
    fn auth_token(&self) -> Option<SecretString>;
    fn set_auth_token(&self, token: Option<SecretString>) -> Result<(), CoreError>;

    fn site_id(&self) -> Option<String>;
    fn set_site_id(&self, site_id: Option<&str>) -> Result<(), CoreError>;

    fn user_email(&self) -> Option<String>;
    fn set_user_email(&self, email: Option<&str>) -> Result<(), CoreError>;

    /// Forget everything (logout).
    fn clear_all(&self) -> Result<(), CoreError> {
        self.set_auth_token(None)?;
        self.set_site_id(None)?;
        self.set_user_email(None)
    }

    fn is_authenticated(&self) -> bool {
        self.auth_token().is_some()
    }
}

#[derive(Debug, Default)]
struct Values {
    auth_token: Option<SecretString>,
    site_id: Option<String>,
    user_email: Option<String>,
}

/// In-process [`ClientState`].
#[derive(Debug, Default)]
pub struct MemoryClientState {
    values: RwLock<Values>,
}

impl MemoryClientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let state = Self::default();
        state.write().auth_token = Some(SecretString::from(token.into()));
        state
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Values> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Values> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClientState for MemoryClientState {
    fn auth_token(&self) -> Option<SecretString> {
        self.read().auth_token.clone()
    }

    fn set_auth_token(&self, token: Option<SecretString>) -> Result<(), CoreError> {
        self.write().auth_token = token;
        Ok(())
    }

    fn site_id(&self) -> Option<String> {
        self.read().site_id.clone()
    }

    fn set_site_id(&self, site_id: Option<&str>) -> Result<(), CoreError> {
        self.write().site_id = site_id.map(str::to_owned);
        Ok(())
    }

    fn user_email(&self) -> Option<String> {
        self.read().user_email.clone()
    }

    fn set_user_email(&self, email: Option<&str>) -> Result<(), CoreError> {
        self.write().user_email = email.map(str::to_owned);
        Ok(())
    }
}
