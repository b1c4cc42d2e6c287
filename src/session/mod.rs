//! Server-side sessions.
//!
//! A session is identified by an unguessable token carried in a cookie and
//! holds string-keyed JSON values in a [`SessionStore`]. The
//! [`SessionManager`] loads a [`Session`] at the start of a request and
//! commits it at the end; only sessions that were written during the request
//! are persisted, and the cookie is only sent when that happens.
//!
//! # Lifecycle
//!
//! ```text
//! cookie token ──load──▶ Session (Unmodified)
//!                          │ put/remove/pop/renew_token
//!                          ▼
//!                        Session (Modified) ──commit──▶ store.save + Set-Cookie
//!                          │ destroy
//!                          ▼
//!                        Session (Destroyed) ──commit──▶ expired Set-Cookie
//! ```

pub mod cookie;
mod context;
mod layer;
mod manager;
mod memory;
mod store;

use thiserror::Error;

pub use context::{Session, Status};
pub use cookie::Cookie;
pub use layer::LoadAndSave;
pub use manager::SessionManager;
pub use memory::MemoryStore;
pub use store::{SessionStore, StoreError};

/// Failures while loading, mutating or committing a session.
///
/// Every variant is a server error: losing session state silently could
/// desynchronize authentication.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The store could not be reached or refused the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A value or the stored payload could not be (de)serialized.
    #[error("session payload: {0}")]
    Codec(#[from] serde_json::Error),
}
