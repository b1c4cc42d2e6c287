//! Persistence adapter contract.
//!
//! The SQL layer is an external collaborator. The pipeline only needs the
//! operations below; [`memory`] provides reference implementations used by
//! tests and local runs.

pub mod memory;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::{MemorySnippets, MemoryUsers};

/// Stable unique identifier of a user account.
///
/// This (never the display name) is what the session stores as the
/// authenticated-user marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    /// Primary key, starting at 1.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// After this instant the snippet is no longer served.
    pub expires: DateTime<Utc>,
}

/// Failures reported by the persistence adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// No (unexpired) record with the requested key.
    #[error("no matching record found")]
    NoRecord,
    /// Unknown email or wrong password; the two are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The email address is already registered.
    #[error("duplicate email")]
    DuplicateEmail,
    /// Anything else the backend reports.
    #[error("storage backend: {0}")]
    Backend(String),
}

/// Snippet persistence.
pub trait SnippetStore: Send + Sync {
    /// Stores a snippet that expires `expires_days` from now; returns its id.
    fn insert(&self, title: &str, content: &str, expires_days: i64) -> Result<i64, ModelError>;

    /// Fetches an unexpired snippet.
    fn get(&self, id: i64) -> Result<Snippet, ModelError>;

    /// The `limit` most recently created unexpired snippets, newest first.
    fn latest(&self, limit: usize) -> Result<Vec<Snippet>, ModelError>;
}

/// User account persistence.
pub trait UserStore: Send + Sync {
    /// Registers a user, hashing `password`.
    fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError>;

    /// Verifies credentials and returns the user's id.
    fn authenticate(&self, email: &str, password: &str) -> Result<UserId, ModelError>;

    /// Whether a user with this id still exists.
    fn exists(&self, id: UserId) -> Result<bool, ModelError>;
}
