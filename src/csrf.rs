//! Cross-site request forgery protection.
//!
//! Each session carries one random 32-byte token. The guard issues it on
//! first contact and, on every unsafe request, requires the client to echo
//! it back in the `csrf_token` form field or the `X-CSRF-Token` header. A
//! missing or wrong token ends the request with 400 before any downstream
//! layer runs.
//!
//! The value handed to rendered forms is never the token itself but a fresh
//! one-time-pad masking of it (`hex(pad || pad ^ token)`), so the bytes in
//! the page differ on every response. Verification unmasks before comparing
//! in constant time and also accepts the raw token.
//!
//! Safe methods (`GET`, `HEAD`, `OPTIONS`, `TRACE`) are never checked.

use std::fmt;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::Method;
use thiserror::Error;

use crate::config::CsrfConfig;
use crate::error::Error;
use crate::forms::{FormData, DEFAULT_MAX_FORM_BYTES};
use crate::token::{constant_time_eq, random_bytes, TOKEN_BYTES};
use crate::web::{add_vary, BoxHandler, Middleware, Request, RequestExt, Response};

/// Session key holding the hex-encoded token.
pub const CSRF_SESSION_KEY: &str = "csrfToken";

/// Why an unsafe request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CsrfError {
    /// No token in the form body or header.
    #[error("CSRF token missing")]
    Missing,
    /// A token was supplied but does not belong to this session.
    #[error("CSRF token mismatch")]
    Mismatch,
    /// The supplied token is not hex or has the wrong length.
    #[error("CSRF token malformed")]
    Malformed,
}

/// The masked token for inclusion in rendered forms.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// The masked token as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken([REDACTED])")
    }
}

/// Whether `method` may change server state.
pub fn is_safe(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE].contains(method)
}

/// Masks `token` with a fresh random pad.
pub fn mask(token: &[u8]) -> String {
    let pad = random_bytes(token.len());
    let mut out = pad.clone();
    out.extend(pad.iter().zip(token).map(|(p, t)| p ^ t));
    hex::encode(out)
}

/// Recovers the raw token from a masked or raw hex value.
pub fn unmask(supplied: &str) -> Result<Vec<u8>, CsrfError> {
    let bytes = hex::decode(supplied.trim()).map_err(|_| CsrfError::Malformed)?;
    match bytes.len() {
        n if n == TOKEN_BYTES * 2 => {
            let (pad, masked) = bytes.split_at(TOKEN_BYTES);
            Ok(pad.iter().zip(masked).map(|(p, m)| p ^ m).collect())
        }
        n if n == TOKEN_BYTES => Ok(bytes),
        _ => Err(CsrfError::Malformed),
    }
}

/// Checks a client-supplied value against the session's token.
pub fn verify(real: &[u8], supplied: Option<&str>) -> Result<(), CsrfError> {
    let supplied = supplied.ok_or(CsrfError::Missing)?;
    let candidate = unmask(supplied)?;
    if constant_time_eq(real, &candidate) {
        Ok(())
    } else {
        Err(CsrfError::Mismatch)
    }
}

/// Issues and verifies the per-session anti-forgery token.
///
/// Must run inside [`LoadAndSave`](crate::session::LoadAndSave); without a
/// session there is nothing to bind the token to and the request fails
/// with 500.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    config: Arc<CsrfConfig>,
    body_limit: usize,
}

impl CsrfGuard {
    /// Creates the guard.
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config: Arc::new(config),
            body_limit: DEFAULT_MAX_FORM_BYTES,
        }
    }

    /// Largest form body searched for the token field. A larger body is
    /// treated as carrying no token.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

fn supplied_token(req: &Request, config: &CsrfConfig, body_limit: usize) -> Option<String> {
    if let Some(value) = req
        .headers()
        .get(config.header_name.as_str())
        .and_then(|v| v.to_str().ok())
    {
        return Some(value.to_string());
    }

    let is_form = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return None;
    }
    FormData::parse_limited(req.body(), body_limit)
        .ok()?
        .get(&config.field_name)
        .map(str::to_string)
}

impl Middleware for CsrfGuard {
    fn name(&self) -> &'static str {
        "csrf"
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let config = Arc::clone(&self.config);
        let body_limit = self.body_limit;
        Arc::new(move |mut req: Request| -> Response {
            let Some(session) = req.session().cloned() else {
                return Error::Fault("CSRF guard requires a session".into()).into_response();
            };

            let real = match session
                .get::<String>(CSRF_SESSION_KEY)
                .and_then(|hex_token| hex::decode(hex_token).ok())
                .filter(|bytes| bytes.len() == TOKEN_BYTES)
            {
                Some(real) => real,
                None => {
                    let fresh = random_bytes(TOKEN_BYTES);
                    if let Err(err) = session.put(CSRF_SESSION_KEY, hex::encode(&fresh)) {
                        return Error::from(err).into_response();
                    }
                    fresh
                }
            };

            if !is_safe(req.method()) {
                let supplied = supplied_token(&req, &config, body_limit);
                if let Err(err) = verify(&real, supplied.as_deref()) {
                    req.log().warn(format_args!(
                        "rejected {} {}: {}",
                        req.method(),
                        req.uri().path(),
                        err
                    ));
                    let mut response = Error::from(err).into_response();
                    add_vary(response.headers_mut(), "Cookie");
                    return response;
                }
            }

            req.extensions_mut().insert(CsrfToken(mask(&real)));
            let mut response = next.call(req);
            add_vary(response.headers_mut(), "Cookie");
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_post(body: String) -> Request {
        http::Request::post("/")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body.into_bytes())
            .unwrap()
    }

    #[test]
    fn form_field_is_read_within_the_body_limit() {
        let config = CsrfConfig::default();
        let req = form_post("csrf_token=abc&title=x".to_string());
        assert_eq!(supplied_token(&req, &config, 64).as_deref(), Some("abc"));
    }

    #[test]
    fn oversized_form_body_supplies_no_token() {
        let config = CsrfConfig::default();
        let req = form_post(format!("csrf_token=abc&content={}", "a".repeat(100)));
        assert_eq!(supplied_token(&req, &config, 64), None);
    }

    #[test]
    fn header_token_ignores_the_body_limit() {
        let config = CsrfConfig::default();
        let mut req = form_post("a".repeat(100));
        req.headers_mut()
            .insert("x-csrf-token", http::HeaderValue::from_static("abc"));
        assert_eq!(supplied_token(&req, &config, 64).as_deref(), Some("abc"));
    }

    #[test]
    fn masked_tokens_differ_but_unmask_to_the_same_bytes() {
        let real = random_bytes(TOKEN_BYTES);
        let a = mask(&real);
        let b = mask(&real);

        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_BYTES * 4);
        assert_eq!(unmask(&a).unwrap(), real);
        assert_eq!(unmask(&b).unwrap(), real);
    }

    #[test]
    fn raw_token_is_accepted() {
        let real = random_bytes(TOKEN_BYTES);
        assert_eq!(verify(&real, Some(&hex::encode(&real))), Ok(()));
    }

    #[test]
    fn verify_distinguishes_failures() {
        let real = random_bytes(TOKEN_BYTES);
        let other = random_bytes(TOKEN_BYTES);

        assert_eq!(verify(&real, None), Err(CsrfError::Missing));
        assert_eq!(verify(&real, Some("zz")), Err(CsrfError::Malformed));
        assert_eq!(verify(&real, Some("abcd")), Err(CsrfError::Malformed));
        assert_eq!(verify(&real, Some(&mask(&other))), Err(CsrfError::Mismatch));
    }

    #[test]
    fn safe_methods() {
        assert!(is_safe(&Method::GET));
        assert!(is_safe(&Method::HEAD));
        assert!(is_safe(&Method::OPTIONS));
        assert!(is_safe(&Method::TRACE));
        assert!(!is_safe(&Method::POST));
        assert!(!is_safe(&Method::PUT));
        assert!(!is_safe(&Method::PATCH));
        assert!(!is_safe(&Method::DELETE));
    }

    #[test]
    fn debug_hides_token() {
        let token = CsrfToken("cafebabe".to_string());
        assert!(!format!("{token:?}").contains("cafebabe"));
    }
}
