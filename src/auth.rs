//! Session-backed authentication state.
//!
//! A session is either [`AuthState::Anonymous`] or
//! [`AuthState::Authenticated`], decided solely by the presence of the
//! [`AUTHENTICATED_USER_ID`] marker. There is no "expired but present"
//! state: an expired session is simply not loaded, which reads as
//! `Anonymous`.
//!
//! # Transitions
//!
//! ```text
//! Anonymous ──log_in(id)──▶ Authenticated(id)      renew token, then put marker
//! Authenticated ──log_out──▶ Anonymous             renew token, then remove marker
//! Authenticated ──user gone──▶ Anonymous           Authenticate layer drops marker
//! ```
//!
//! Both explicit transitions renew the token first, so a token an attacker
//! planted before login is worthless after it.

use std::sync::Arc;

use http::header::{self, HeaderValue};

use crate::error::Error;
use crate::models::{UserId, UserStore};
use crate::session::{Session, SessionError};
use crate::web::{redirect, BoxHandler, Middleware, Request, RequestExt, Response};

/// Session key of the authenticated-user marker.
pub const AUTHENTICATED_USER_ID: &str = "authenticatedUserID";

/// Authentication state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No authenticated user.
    #[default]
    Anonymous,
    /// Logged in as this user.
    Authenticated(UserId),
}

impl AuthState {
    /// Reads the state from the session marker.
    pub fn of(session: &Session) -> Self {
        match session.get::<UserId>(AUTHENTICATED_USER_ID) {
            Some(id) => AuthState::Authenticated(id),
            None => AuthState::Anonymous,
        }
    }

    /// True for `Authenticated`.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    /// The authenticated user, if any.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            AuthState::Authenticated(id) => Some(*id),
            AuthState::Anonymous => None,
        }
    }
}

/// `Anonymous → Authenticated(id)`.
pub fn log_in(session: &Session, id: UserId) -> Result<(), SessionError> {
    session.renew_token()?;
    session.put(AUTHENTICATED_USER_ID, id)?;
    tracing::info!(user_id = %id, "user logged in");
    Ok(())
}

/// `Authenticated → Anonymous`.
pub fn log_out(session: &Session) -> Result<(), SessionError> {
    session.renew_token()?;
    session.remove(AUTHENTICATED_USER_ID);
    tracing::info!("user logged out");
    Ok(())
}

// ============================================================================
// Authenticate: resolve the state once per request
// ============================================================================

/// Resolves [`AuthState`] for the request and stores it in extensions.
///
/// A marker naming a user that no longer exists is dropped, so a deleted
/// account is logged out on its next request.
#[derive(Clone)]
pub struct Authenticate {
    users: Arc<dyn UserStore>,
}

impl Authenticate {
    /// Creates the layer over `users`.
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

impl Middleware for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let users = Arc::clone(&self.users);
        Arc::new(move |mut req: Request| -> Response {
            let state = match req.session() {
                None => AuthState::Anonymous,
                Some(session) => match AuthState::of(session) {
                    AuthState::Anonymous => AuthState::Anonymous,
                    AuthState::Authenticated(id) => match users.exists(id) {
                        Ok(true) => AuthState::Authenticated(id),
                        Ok(false) => {
                            req.log().warn(format_args!("user {id} no longer exists"));
                            session.remove(AUTHENTICATED_USER_ID);
                            AuthState::Anonymous
                        }
                        Err(err) => return Error::from(err).into_response(),
                    },
                },
            };
            req.extensions_mut().insert(state);
            next.call(req)
        })
    }
}

// ============================================================================
// RequireAuthentication: the guard on protected routes
// ============================================================================

/// Redirects anonymous requests to the login page; marks authenticated
/// responses `Cache-Control: no-store`.
#[derive(Debug, Clone)]
pub struct RequireAuthentication {
    login_path: Arc<str>,
}

impl RequireAuthentication {
    /// Creates the guard redirecting to `login_path`.
    pub fn new(login_path: impl Into<Arc<str>>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }
}

impl Middleware for RequireAuthentication {
    fn name(&self) -> &'static str {
        "require_authentication"
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let login_path = Arc::clone(&self.login_path);
        Arc::new(move |req: Request| -> Response {
            let authenticated = req
                .session()
                .is_some_and(|session| session.exists(AUTHENTICATED_USER_ID));

            if !authenticated {
                req.log().info(format_args!(
                    "anonymous request to {} redirected to login",
                    req.uri().path()
                ));
                return redirect(&login_path).unwrap_or_else(Error::into_response);
            }

            let mut response = next.call(req);
            response
                .headers_mut()
                .append(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::{MemoryStore, SessionManager};

    fn session() -> Session {
        SessionManager::new(Arc::new(MemoryStore::new()), SessionConfig::default())
            .load(None)
            .unwrap()
    }

    #[test]
    fn fresh_session_is_anonymous() {
        assert_eq!(AuthState::of(&session()), AuthState::Anonymous);
    }

    #[test]
    fn log_in_then_out() {
        let s = session();
        log_in(&s, UserId(7)).unwrap();
        assert_eq!(AuthState::of(&s), AuthState::Authenticated(UserId(7)));
        assert_eq!(AuthState::of(&s).user_id(), Some(UserId(7)));

        log_out(&s).unwrap();
        assert_eq!(AuthState::of(&s), AuthState::Anonymous);
        assert!(!s.exists(AUTHENTICATED_USER_ID));
    }

    #[test]
    fn each_transition_renews_the_token() {
        let s = session();
        log_in(&s, UserId(1)).unwrap();
        let after_login = s.token().unwrap().expose_secret().clone();
        log_out(&s).unwrap();
        let after_logout = s.token().unwrap().expose_secret().clone();
        assert_ne!(after_login, after_logout);
    }

    #[test]
    fn marker_is_the_numeric_id() {
        let s = session();
        log_in(&s, UserId(42)).unwrap();
        assert_eq!(s.get::<i64>(AUTHENTICATED_USER_ID), Some(42));
    }
}
