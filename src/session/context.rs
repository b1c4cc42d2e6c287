use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::SessionStore;
use super::SessionError;
use crate::secret::Secret;
use crate::token::generate_token;

/// Write state of a session within the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing changed; commit is a no-op.
    Unmodified,
    /// Data or token changed; commit saves and sends the cookie.
    Modified,
    /// Destroyed; commit sends an expired cookie.
    Destroyed,
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    deadline: DateTime<Utc>,
    values: &'a BTreeMap<String, Value>,
}

/// Stored form of a session.
#[derive(Deserialize)]
pub(crate) struct Payload {
    pub(crate) deadline: DateTime<Utc>,
    pub(crate) values: BTreeMap<String, Value>,
}

impl Payload {
    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, SessionError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

struct Inner {
    token: Option<String>,
    deadline: DateTime<Utc>,
    values: BTreeMap<String, Value>,
    status: Status,
    // The token is known to the store, so writes must not re-create it.
    stored: bool,
}

impl Inner {
    fn encode(&self) -> Result<Vec<u8>, SessionError> {
        Ok(serde_json::to_vec(&PayloadRef {
            deadline: self.deadline,
            values: &self.values,
        })?)
    }
}

/// What a commit did.
pub(crate) enum Commit {
    Unchanged,
    Saved {
        token: String,
        expiry: DateTime<Utc>,
    },
    Destroyed,
    Retired,
}

/// One request's view of a session.
///
/// Cheap to clone; clones share state. Values are stored as JSON so any
/// `Serialize` type can be put and read back with the same type.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use snippetbox_core::config::SessionConfig;
/// use snippetbox_core::session::{MemoryStore, SessionManager};
///
/// let manager = SessionManager::new(Arc::new(MemoryStore::new()), SessionConfig::default());
/// let session = manager.load(None).unwrap();
///
/// session.put("flash", "Snippet successfully created!").unwrap();
/// assert_eq!(session.pop_string("flash").as_deref(), Some("Snippet successfully created!"));
/// assert_eq!(session.pop_string("flash"), None);
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
    store: Arc<dyn SessionStore>,
    idle_timeout: Option<Duration>,
}

impl Session {
    pub(crate) fn new(
        store: Arc<dyn SessionStore>,
        token: Option<String>,
        deadline: DateTime<Utc>,
        values: BTreeMap<String, Value>,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                stored: token.is_some(),
                token,
                deadline,
                values,
                status: Status::Unmodified,
            })),
            store,
            idle_timeout,
        }
    }

    /// Reads `key` as a `T`. Absent keys and values of another shape both
    /// read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let inner = self.inner.lock();
        let value = inner.values.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Stores `value` under `key`.
    pub fn put<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.inner.lock();
        inner.values.insert(key.to_string(), value);
        inner.status = Status::Modified;
        Ok(())
    }

    /// Deletes `key`. The session is only marked modified if the key existed.
    pub fn remove(&self, key: &str) {
        let mut inner = self.inner.lock();
        if inner.values.remove(key).is_some() {
            inner.status = Status::Modified;
        }
    }

    /// Removes `key` and returns it if it held a string.
    ///
    /// A second call returns `None`, which is what makes flash messages
    /// display exactly once.
    pub fn pop_string(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock();
        let value = inner.values.remove(key)?;
        inner.status = Status::Modified;
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether `key` is present.
    pub fn exists(&self, key: &str) -> bool {
        self.inner.lock().values.contains_key(key)
    }

    /// Stored keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().values.keys().cloned().collect()
    }

    /// Replaces the token with a fresh one, keeping every value.
    ///
    /// If the session is already stored, its payload moves to the new token
    /// immediately and the old token stops resolving. Call this before
    /// granting or revoking authenticated state.
    pub fn renew_token(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        let new_token = generate_token();

        if let Some(old_token) = inner.token.as_deref().filter(|_| inner.stored) {
            let expiry = self.expiry(inner.deadline);
            let data = inner.encode()?;
            self.store.rename(old_token, &new_token, &data, expiry)?;
        }

        inner.token = Some(new_token);
        inner.status = Status::Modified;
        tracing::debug!("session token renewed");
        Ok(())
    }

    /// Deletes the session from the store and clears its values.
    pub fn destroy(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if let Some(token) = inner.token.take() {
            self.store.delete(&token)?;
        }
        inner.stored = false;
        inner.values.clear();
        inner.status = Status::Destroyed;
        Ok(())
    }

    /// Current token, if one has been allocated.
    pub fn token(&self) -> Option<Secret<String>> {
        self.inner.lock().token.clone().map(Secret::new)
    }

    /// Write state within this request.
    pub fn status(&self) -> Status {
        self.inner.lock().status
    }

    /// Absolute expiry fixed when the session was created.
    pub fn deadline(&self) -> DateTime<Utc> {
        self.inner.lock().deadline
    }

    // Store expiry and cookie expiry: the deadline, or sooner under an idle timeout.
    fn expiry(&self, deadline: DateTime<Utc>) -> DateTime<Utc> {
        match self.idle_timeout {
            Some(idle) => deadline.min(Utc::now() + idle),
            None => deadline,
        }
    }

    pub(crate) fn commit(&self) -> Result<Commit, SessionError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        match inner.status {
            Status::Unmodified => Ok(Commit::Unchanged),
            Status::Destroyed => Ok(Commit::Destroyed),
            Status::Modified => {
                let expiry = self.expiry(inner.deadline);
                let data = inner.encode()?;

                let token = match inner.token.clone() {
                    Some(token) if inner.stored => {
                        if !self.store.update(&token, &data, expiry)? {
                            tracing::warn!("session token retired concurrently; write dropped");
                            inner.status = Status::Unmodified;
                            return Ok(Commit::Retired);
                        }
                        token
                    }
                    _ => {
                        let token = inner.token.get_or_insert_with(generate_token).clone();
                        self.store.save(&token, &data, expiry)?;
                        inner.stored = true;
                        token
                    }
                };
                inner.status = Status::Unmodified;
                Ok(Commit::Saved { token, expiry })
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Session")
            .field("token", &inner.token.as_ref().map(|_| "[REDACTED]"))
            .field("deadline", &inner.deadline)
            .field("keys", &inner.values.keys().collect::<Vec<_>>())
            .field("status", &inner.status)
            .finish()
    }
}
