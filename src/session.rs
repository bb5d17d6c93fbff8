//! Persisted session and preference state.
//!
//! Two independent fjall partitions back this store: `auth` holds the signed-in
//! user and token and is wiped wholesale on logout or failed startup
//! validation; `prefs` holds device-scoped settings (display currency, theme)
//! and survives logout.

use crate::api::ApiClient;
use crate::models::User;
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

pub const PREF_DISPLAY_CURRENCY: &str = "display_currency";
pub const PREF_THEME: &str = "theme";

/// Invariant: `user` and `token` are either both set or both absent.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
}

pub struct SessionStore {
    keyspace: Keyspace,
    auth: PartitionHandle,
    prefs: PartitionHandle,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn open(data_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_path)
            .with_context(|| format!("Failed to create data dir: {}", data_path.display()))?;
        let keyspace = fjall::Config::new(data_path.join("session")).open()?;
        let auth = keyspace.open_partition("auth", PartitionCreateOptions::default())?;
        let prefs = keyspace.open_partition("prefs", PartitionCreateOptions::default())?;
        Ok(SessionStore {
            keyspace,
            auth,
            prefs,
            state: RwLock::new(SessionState::default()),
        })
    }

    /// Runs once at startup: restores the persisted token and validates it
    /// against the backend. An invalid or expired token is wiped rather than
    /// retried, leaving the store signed out.
    pub async fn hydrate(&self, api: &ApiClient) -> Result<()> {
        let token = match self.auth.get(TOKEN_KEY)? {
            Some(raw) => String::from_utf8_lossy(&raw).to_string(),
            None => {
                debug!("No persisted token, starting signed out");
                return Ok(());
            }
        };

        api.set_token(Some(token.clone()));
        match api.current_user().await {
            Ok(user) => {
                info!(email = %user.email, "Session restored");
                self.write_session(user, token)?;
                Ok(())
            }
            Err(err) => {
                debug!(%err, "Persisted token rejected, clearing auth state");
                self.clear_session(api)?;
                Ok(())
            }
        }
    }

    pub async fn login(&self, api: &ApiClient, email: &str, password: &str) -> Result<User> {
        let token = api.login(email, password).await?.access_token;
        api.set_token(Some(token.clone()));
        let user = match api.current_user().await {
            Ok(user) => user,
            Err(err) => {
                // Never keep a token without its user.
                api.set_token(None);
                return Err(err.into());
            }
        };
        self.write_session(user.clone(), token)?;
        info!(email = %user.email, "Signed in");
        Ok(user)
    }

    pub async fn signup(
        &self,
        api: &ApiClient,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<User> {
        api.signup(email, password, full_name).await?;
        self.login(api, email, password).await
    }

    /// Removes user and token together; preferences are deliberately left
    /// alone, they belong to the device rather than the account.
    pub fn clear_session(&self, api: &ApiClient) -> Result<()> {
        {
            let mut state = self.state.write().unwrap();
            *state = SessionState::default();
        }
        api.set_token(None);
        self.auth.remove(TOKEN_KEY)?;
        self.auth.remove(USER_KEY)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Session cleared");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.state.read().unwrap();
        state.user.is_some() && state.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        let state = self.state.read().unwrap();
        state.token.is_some() && state.user.as_ref().is_some_and(|u| u.is_admin)
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().unwrap().user.clone()
    }

    pub fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.prefs.insert(key, value)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(key, value, "Preference saved");
        Ok(())
    }

    pub fn preference(&self, key: &str) -> Option<String> {
        self.prefs
            .get(key)
            .ok()
            .flatten()
            .map(|raw| String::from_utf8_lossy(&raw).to_string())
    }

    /// Display currency preference, falling back to the config default.
    pub fn display_currency(&self, fallback: &str) -> String {
        self.preference(PREF_DISPLAY_CURRENCY)
            .unwrap_or_else(|| fallback.to_string())
    }

    fn write_session(&self, user: User, token: String) -> Result<()> {
        {
            let mut state = self.state.write().unwrap();
            *state = SessionState {
                user: Some(user.clone()),
                token: Some(token.clone()),
            };
        }
        self.auth.insert(TOKEN_KEY, token.as_bytes())?;
        self.auth.insert(USER_KEY, serde_json::to_vec(&user)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}
