//! `Set-Cookie` rendering and `Cookie` header parsing.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use http::header::{HeaderValue, InvalidHeaderValue};

use crate::config::{SameSite, SessionConfig};

/// A cookie to be sent in a `Set-Cookie` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value (the session token).
    pub value: String,
    /// `Path` attribute.
    pub path: String,
    /// `Expires` attribute.
    pub expires: Option<DateTime<Utc>>,
    /// `Max-Age` attribute in seconds; `0` deletes the cookie.
    pub max_age: Option<i64>,
    /// `Secure` attribute.
    pub secure: bool,
    /// `HttpOnly` attribute.
    pub http_only: bool,
    /// `SameSite` attribute.
    pub same_site: Option<SameSite>,
}

impl Cookie {
    /// The session cookie carrying `token` until `expiry`.
    pub fn session(config: &SessionConfig, token: &str, expiry: DateTime<Utc>) -> Self {
        let max_age = (expiry - Utc::now()).num_seconds().max(1);
        Self {
            name: config.cookie_name.clone(),
            value: token.to_string(),
            path: config.path.clone(),
            expires: Some(expiry),
            max_age: Some(max_age),
            secure: config.secure,
            http_only: config.http_only,
            same_site: Some(config.same_site),
        }
    }

    /// A cookie that makes the browser forget the session.
    pub fn expired(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            value: String::new(),
            path: config.path.clone(),
            expires: Utc.timestamp_opt(0, 0).single(),
            max_age: Some(0),
            secure: config.secure,
            http_only: config.http_only,
            same_site: Some(config.same_site),
        }
    }

    /// Renders the cookie as a header value.
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if !self.path.is_empty() {
            write!(f, "; Path={}", self.path)?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT"))?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("expires", &self.expires)
            .field("max_age", &self.max_age)
            .finish()
    }
}

/// Finds the value of `name` in a `Cookie` request header.
pub fn find<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}
