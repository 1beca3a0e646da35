use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::error::CoachResult;
use crate::store::KeyValueStore;

pub const TOKEN_KEY: &str = "token";
pub const USERNAME_KEY: &str = "username";

/// Credentials in, `{token, username}` out.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub username: String,
}

/// Persists the session in the injected key-value store.
pub struct SessionStore<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        SessionStore { store }
    }

    /// A stored token without a username still counts as a session.
    pub fn load(&self) -> CoachResult<Option<Session>> {
        let token = match self.store.get(TOKEN_KEY)? {
            Some(t) if !t.is_empty() => t,
            _ => return Ok(None),
        };
        let username = self.store.get(USERNAME_KEY)?.unwrap_or_default();
        Ok(Some(Session { token, username }))
    }

    pub fn save(&self, session: &Session) {
        let result = self
            .store
            .set(TOKEN_KEY, &session.token)
            .and_then(|_| self.store.set(USERNAME_KEY, &session.username));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist session");
        }
    }

    pub fn clear(&self) {
        let result = self
            .store
            .remove(TOKEN_KEY)
            .and_then(|_| self.store.remove(USERNAME_KEY));
        if let Err(e) = result {
            warn!(error = %e, "failed to clear session");
        }
    }
}

impl Session {
    /// Identity the learned map is keyed under.
    pub fn identity(&self) -> Option<&str> {
        Some(self.username.as_str()).filter(|u| !u.is_empty())
    }
}
