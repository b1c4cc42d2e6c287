use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};

use super::context::{Commit, Payload, Session};
use super::cookie::Cookie;
use super::store::SessionStore;
use super::SessionError;
use crate::config::SessionConfig;

/// Loads and commits sessions against one store with one cookie policy.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
    lifetime: Duration,
    idle_timeout: Option<Duration>,
}

// Anything beyond chrono's range is effectively forever.
fn to_chrono(d: std::time::Duration) -> Duration {
    Duration::from_std(d).unwrap_or_else(|_| Duration::days(365 * 100))
}

impl SessionManager {
    /// Creates a manager over `store`.
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            lifetime: to_chrono(config.lifetime),
            idle_timeout: config.idle_timeout.map(to_chrono),
            store,
            config,
        }
    }

    /// Cookie and lifetime settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Loads the session for `token`.
    ///
    /// A missing token, an unknown token and an expired session all yield a
    /// fresh, empty session with no token; one is allocated when it is
    /// first committed.
    pub fn load(&self, token: Option<&str>) -> Result<Session, SessionError> {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            if let Some(bytes) = self.store.load(token)? {
                let payload = Payload::decode(&bytes)?;
                if payload.deadline > Utc::now() {
                    return Ok(Session::new(
                        Arc::clone(&self.store),
                        Some(token.to_string()),
                        payload.deadline,
                        payload.values,
                        self.idle_timeout,
                    ));
                }
            }
        }

        Ok(Session::new(
            Arc::clone(&self.store),
            None,
            Utc::now() + self.lifetime,
            BTreeMap::new(),
            self.idle_timeout,
        ))
    }

    /// Persists `session` if it changed and returns the cookie to send.
    pub fn commit(&self, session: &Session) -> Result<Option<Cookie>, SessionError> {
        Ok(match session.commit()? {
            Commit::Unchanged | Commit::Retired => None,
            Commit::Saved { token, expiry } => {
                Some(Cookie::session(&self.config, &token, expiry))
            }
            Commit::Destroyed => Some(Cookie::expired(&self.config)),
        })
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
