use chrono::{DateTime, Utc};
use thiserror::Error;

/// A session store backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend is unreachable or rejected the operation.
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Token-keyed persistence for encoded session payloads.
///
/// Implementations must make each call atomic per token: a concurrent
/// reader sees either the old or the new payload, never a mix. Expired
/// entries must never be returned by [`load`](Self::load).
pub trait SessionStore: Send + Sync {
    /// Returns the payload stored under `token`, if present and unexpired.
    fn load(&self, token: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Stores `data` under `token` until `expiry`, replacing any previous
    /// payload.
    fn save(&self, token: &str, data: &[u8], expiry: DateTime<Utc>) -> Result<(), StoreError>;

    /// Removes `token`. Deleting an unknown token is not an error.
    fn delete(&self, token: &str) -> Result<(), StoreError>;

    /// Replaces the payload under `token` only if it is still stored and
    /// unexpired. Returns false, writing nothing, once the token has been
    /// renamed, deleted or has expired.
    ///
    /// The default checks with [`load`](Self::load) before saving, which
    /// leaves a window between the two calls. Stores that can do both in one
    /// step should override it.
    fn update(&self, token: &str, data: &[u8], expiry: DateTime<Utc>) -> Result<bool, StoreError> {
        if self.load(token)?.is_none() {
            return Ok(false);
        }
        self.save(token, data, expiry)?;
        Ok(true)
    }

    /// Moves a payload from `old` to `new`.
    ///
    /// The default saves under `new` before deleting `old`, so a reader
    /// racing on `old` sees the complete old payload or nothing. Stores that
    /// can do both in one step should override it.
    fn rename(
        &self,
        old: &str,
        new: &str,
        data: &[u8],
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.save(new, data, expiry)?;
        self.delete(old)
    }
}
