//! In-memory persistence adapters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use parking_lot::Mutex;

use super::{ModelError, Snippet, SnippetStore, UserId, UserStore};

/// Snippets held in a vector; ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct MemorySnippets {
    rows: Mutex<Vec<Snippet>>,
}

impl MemorySnippets {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnippetStore for MemorySnippets {
    fn insert(&self, title: &str, content: &str, expires_days: i64) -> Result<i64, ModelError> {
        let mut rows = self.rows.lock();
        let id = rows.len() as i64 + 1;
        let created = Utc::now();
        rows.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created,
            expires: created + Duration::days(expires_days),
        });
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Snippet, ModelError> {
        let now = Utc::now();
        self.rows
            .lock()
            .iter()
            .find(|s| s.id == id && s.expires > now)
            .cloned()
            .ok_or(ModelError::NoRecord)
    }

    fn latest(&self, limit: usize) -> Result<Vec<Snippet>, ModelError> {
        let now = Utc::now();
        Ok(self
            .rows
            .lock()
            .iter()
            .rev()
            .filter(|s| s.expires > now)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Debug)]
struct UserRow {
    id: UserId,
    email: String,
    hashed_password: String,
}

/// User accounts with Argon2id password hashes.
#[derive(Debug, Default)]
pub struct MemoryUsers {
    rows: Mutex<Vec<UserRow>>,
}

impl MemoryUsers {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUsers {
    fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError> {
        // Hash outside the lock.
        let hashed_password = hash_password(password)?;

        let mut rows = self.rows.lock();
        if rows.iter().any(|u| u.email == email) {
            return Err(ModelError::DuplicateEmail);
        }
        let id = UserId(rows.len() as i64 + 1);
        tracing::debug!(user_id = %id, name, "user registered");
        rows.push(UserRow {
            id,
            email: email.to_string(),
            hashed_password,
        });
        Ok(())
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<UserId, ModelError> {
        let found = self
            .rows
            .lock()
            .iter()
            .find(|u| u.email == email)
            .map(|u| (u.id, u.hashed_password.clone()));

        let Some((id, hashed_password)) = found else {
            return Err(ModelError::InvalidCredentials);
        };

        if verify_password(password, &hashed_password)? {
            Ok(id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    fn exists(&self, id: UserId) -> Result<bool, ModelError> {
        Ok(self.rows.lock().iter().any(|u| u.id == id))
    }
}

/// Hashes a password with Argon2id, returning a PHC-format string.
fn hash_password(password: &str) -> Result<String, ModelError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ModelError::Backend(format!("failed to hash password: {e}")))
}

/// Checks a password against a PHC-format hash.
fn verify_password(password: &str, hash: &str) -> Result<bool, ModelError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ModelError::Backend(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
