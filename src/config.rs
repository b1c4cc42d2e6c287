//! Pipeline configuration.
//!
//! One [`Config`] is built at startup and handed to
//! [`Application::new`](crate::app::Application::new); nothing reads
//! configuration from ambient global state afterwards.
//!
//! ## Environment variables
//! - `SNIPPETBOX_SESSION_COOKIE`: session cookie name (default: `session`)
//! - `SNIPPETBOX_SESSION_LIFETIME_SECS`: absolute session lifetime (default: 43200)
//! - `SNIPPETBOX_SESSION_IDLE_TIMEOUT_SECS`: idle timeout, unset for none
//! - `SNIPPETBOX_COOKIE_SECURE`: `true`/`false` (default: `true`)
//! - `SNIPPETBOX_LOGIN_PATH`: where the auth guard redirects (default: `/user/login`)
//! - `SNIPPETBOX_MAX_FORM_BYTES`: body size limit for submissions (default: 4096)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::forms::DEFAULT_MAX_FORM_BYTES;

/// A configuration value that could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value of the wrong shape.
    #[error("invalid value {value:?} for {var}: expected {expected}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
        /// What the variable should contain.
        expected: &'static str,
    },
}

/// `SameSite` attribute of the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=Lax`
    Lax,
    /// `SameSite=None` (requires `Secure`)
    None,
}

impl SameSite {
    /// Attribute value as written in `Set-Cookie`.
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Session cookie and lifetime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Cookie name carrying the session token.
    pub cookie_name: String,
    /// Absolute lifetime, counted from session creation.
    pub lifetime: Duration,
    /// Optional inactivity limit, counted from the last write.
    pub idle_timeout: Option<Duration>,
    /// `Secure` cookie attribute.
    pub secure: bool,
    /// `HttpOnly` cookie attribute.
    pub http_only: bool,
    /// `Path` cookie attribute.
    pub path: String,
    /// `SameSite` cookie attribute.
    pub same_site: SameSite,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session".to_string(),
            lifetime: Duration::from_secs(12 * 60 * 60),
            idle_timeout: None,
            secure: true,
            http_only: true,
            path: "/".to_string(),
            same_site: SameSite::Lax,
        }
    }
}

/// Where the anti-forgery token travels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfConfig {
    /// Hidden form field name.
    pub field_name: String,
    /// Request header name (for non-form clients).
    pub header_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            field_name: "csrf_token".to_string(),
            header_name: "X-CSRF-Token".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Session settings.
    pub session: SessionConfig,
    /// CSRF settings.
    pub csrf: CsrfConfig,
    /// Redirect target for anonymous requests to protected routes.
    pub login_path: String,
    /// Largest accepted form body.
    pub max_form_bytes: usize,
    /// How many snippets the home page lists.
    pub latest_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            csrf: CsrfConfig::default(),
            login_path: "/user/login".to_string(),
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
            latest_limit: 10,
        }
    }
}

impl Config {
    /// Builds a configuration from `SNIPPETBOX_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("SNIPPETBOX_SESSION_COOKIE") {
            config.session.cookie_name = name;
        }
        if let Some(secs) =
            parse_var::<u64, _>(&lookup, "SNIPPETBOX_SESSION_LIFETIME_SECS", "seconds")?
        {
            config.session.lifetime = Duration::from_secs(secs);
        }
        if let Some(secs) =
            parse_var::<u64, _>(&lookup, "SNIPPETBOX_SESSION_IDLE_TIMEOUT_SECS", "seconds")?
        {
            config.session.idle_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secure) =
            parse_var::<bool, _>(&lookup, "SNIPPETBOX_COOKIE_SECURE", "true or false")?
        {
            config.session.secure = secure;
        }
        if let Some(path) = lookup("SNIPPETBOX_LOGIN_PATH") {
            config.login_path = path;
        }
        if let Some(limit) =
            parse_var::<usize, _>(&lookup, "SNIPPETBOX_MAX_FORM_BYTES", "a byte count")?
        {
            config.max_form_bytes = limit;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(
    lookup: &F,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var,
                value,
                expected,
            }),
    }
}
