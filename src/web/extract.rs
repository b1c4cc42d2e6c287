//! Typed access to per-request state.
//!
//! Interceptors deposit what they learn in request extensions; handlers read
//! it back through [`RequestExt`] instead of poking at the extension map.

use http::header;

use super::{PathParams, Request};
use crate::auth::AuthState;
use crate::csrf::CsrfToken;
use crate::forms::{FormData, FormError};
use crate::logging::RequestLog;
use crate::request::RequestId;
use crate::session::{cookie, Session};

/// Accessors for state attached to a [`Request`] by the pipeline.
///
/// # Examples
///
/// ```
/// use http::header;
/// use snippetbox_core::web::{Request, RequestExt};
///
/// let req = http::Request::builder()
///     .header(header::COOKIE, "theme=dark; session=abc123")
///     .body(Vec::new())
///     .unwrap();
///
/// assert_eq!(req.cookie("session").as_deref(), Some("abc123"));
/// assert!(req.session().is_none());
/// assert_eq!(req.request_id(), "-");
/// ```
pub trait RequestExt {
    /// The session loaded by the session layer, if it ran.
    fn session(&self) -> Option<&Session>;

    /// Authentication state resolved for this request; `Anonymous` when no
    /// authentication layer ran.
    fn auth_state(&self) -> AuthState;

    /// The masked CSRF token for rendered forms, if the CSRF guard ran.
    fn csrf_token(&self) -> Option<&CsrfToken>;

    /// A named path parameter captured by the router.
    fn path_param(&self, name: &str) -> Option<&str>;

    /// Correlation id, or `-` when the logging layer did not run.
    fn request_id(&self) -> &str;

    /// Logger bound to this request's id.
    fn log(&self) -> RequestLog<'_> {
        RequestLog::new(self.request_id())
    }

    /// The value of the first cookie named `name`.
    fn cookie(&self, name: &str) -> Option<String>;

    /// Decodes the url-encoded body, refusing bodies over `limit` bytes.
    fn form_data(&self, limit: usize) -> Result<FormData, FormError>;
}

impl RequestExt for Request {
    fn session(&self) -> Option<&Session> {
        self.extensions().get::<Session>()
    }

    fn auth_state(&self) -> AuthState {
        self.extensions()
            .get::<AuthState>()
            .copied()
            .unwrap_or(AuthState::Anonymous)
    }

    fn csrf_token(&self) -> Option<&CsrfToken> {
        self.extensions().get::<CsrfToken>()
    }

    fn path_param(&self, name: &str) -> Option<&str> {
        self.extensions().get::<PathParams>()?.get(name)
    }

    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestId>()
            .map(RequestId::as_str)
            .unwrap_or("-")
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| cookie::find(value, name))
            .map(str::to_string)
    }

    fn form_data(&self, limit: usize) -> Result<FormData, FormError> {
        FormData::parse_limited(self.body(), limit)
    }
}
