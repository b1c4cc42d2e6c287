//! Typed form extraction.
//!
//! Submissions arrive as `application/x-www-form-urlencoded` bodies. Each form
//! has an explicit extraction function that reads its named fields out of a
//! [`FormData`] and coerces them to the field types, reporting coercion
//! failures as [`FormError`] (a 400, not a validation message). Structural
//! validation is a separate step that records messages in the form's
//! embedded [`Validator`].

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::secret::Secret;
use crate::validator::{Check, Validator};

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Snippet lifetimes (in days) a submission may choose from.
pub const PERMITTED_EXPIRES: [i64; 3] = [1, 7, 365];

/// Lifetime preselected on an empty create form.
pub const DEFAULT_EXPIRES: i64 = 365;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Largest url-encoded body accepted unless configured otherwise.
pub const DEFAULT_MAX_FORM_BYTES: usize = 4096;

/// A submission body that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The body is larger than the configured limit.
    #[error("form body exceeds {limit} bytes")]
    TooLarge {
        /// The configured limit.
        limit: usize,
    },
    /// Bad percent-encoding or invalid UTF-8.
    #[error("malformed form encoding")]
    Malformed,
    /// A field that must hold an integer holds something else.
    #[error("field `{field}` must be an integer")]
    InvalidInteger {
        /// Name of the offending field.
        field: String,
    },
}

/// Raw decoded key/value pairs from a url-encoded body.
///
/// Repeated keys keep every value; accessors read the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
}

impl FormData {
    /// Decodes a url-encoded body.
    pub fn parse(body: &[u8]) -> Result<Self, FormError> {
        let body = std::str::from_utf8(body).map_err(|_| FormError::Malformed)?;
        let mut fields: HashMap<String, Vec<String>> = HashMap::new();

        for pair in body.split('&').filter(|s| !s.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            fields
                .entry(percent_decode(key)?)
                .or_default()
                .push(percent_decode(value)?);
        }

        Ok(Self { fields })
    }

    /// Decodes a url-encoded body no larger than `limit` bytes.
    pub fn parse_limited(body: &[u8], limit: usize) -> Result<Self, FormError> {
        if body.len() > limit {
            return Err(FormError::TooLarge { limit });
        }
        Self::parse(body)
    }

    /// The first value submitted for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// The first value for `name`, or an empty string when absent.
    pub fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    /// The first value for `name` as an integer.
    ///
    /// An absent or empty field decodes to 0 so that range rules, not the
    /// decoder, report it. Anything else that is not an integer is an error.
    pub fn int(&self, name: &str) -> Result<i64, FormError> {
        match self.get(name).map(str::trim) {
            None | Some("") => Ok(0),
            Some(raw) => raw.parse().map_err(|_| FormError::InvalidInteger {
                field: name.to_string(),
            }),
        }
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the body held no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn percent_decode(input: &str) -> Result<String, FormError> {
    decode(input, true).ok_or(FormError::Malformed)
}

/// Percent-decodes one path segment; `+` is kept literally.
pub(crate) fn percent_decode_path(input: &str) -> Option<String> {
    decode(input, false)
}

fn decode(input: &str, plus_as_space: bool) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' if plus_as_space => out.push(b' '),
            b'%' => {
                let hi = bytes.get(i + 1).copied().and_then(hex_val)?;
                let lo = bytes.get(i + 2).copied().and_then(hex_val)?;
                out.push(hi << 4 | lo);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8(out).ok()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

// ============================================================================
// Snippet creation
// ============================================================================

/// The "create snippet" submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetCreateForm {
    /// Snippet title.
    pub title: String,
    /// Snippet body.
    pub content: String,
    /// Lifetime in days.
    pub expires: i64,
    /// Validation state.
    #[serde(flatten)]
    pub validator: Validator,
}

impl Default for SnippetCreateForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: DEFAULT_EXPIRES,
            validator: Validator::default(),
        }
    }
}

impl SnippetCreateForm {
    /// Reads `title`, `content` and `expires` from a submission.
    pub fn from_form_data(data: &FormData) -> Result<Self, FormError> {
        Ok(Self {
            title: data.text("title"),
            content: data.text("content"),
            expires: data.int("expires")?,
            validator: Validator::default(),
        })
    }

    /// Runs the structural checks; returns whether the form is valid.
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check("title", Check::not_blank(&self.title));
        v.check("title", Check::max_chars(&self.title, MAX_TITLE_CHARS));
        v.check("content", Check::not_blank(&self.content));
        v.check("expires", Check::permitted(&self.expires, &PERMITTED_EXPIRES));
        v.valid()
    }
}

// ============================================================================
// Signup
// ============================================================================

/// The "sign up" submission. The password is never serialized.
#[derive(Debug, Serialize)]
pub struct UserSignupForm {
    /// Display name.
    pub name: String,
    /// Email address (the login identifier).
    pub email: String,
    /// Plain-text password, only ever handed to the user store.
    #[serde(skip)]
    pub password: Secret<String>,
    /// Validation state.
    #[serde(flatten)]
    pub validator: Validator,
}

impl Default for UserSignupForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            password: Secret::new(String::new()),
            validator: Validator::default(),
        }
    }
}

impl UserSignupForm {
    /// Reads `name`, `email` and `password` from a submission.
    pub fn from_form_data(data: &FormData) -> Result<Self, FormError> {
        Ok(Self {
            name: data.text("name"),
            email: data.text("email"),
            password: Secret::new(data.text("password")),
            validator: Validator::default(),
        })
    }

    /// Runs the structural checks; returns whether the form is valid.
    pub fn validate(&mut self) -> bool {
        let password = self.password.expose_secret();
        let v = &mut self.validator;
        v.check("name", Check::not_blank(&self.name));
        v.check("email", Check::not_blank(&self.email));
        v.check("email", Check::email(&self.email));
        v.check("password", Check::not_blank(password));
        v.check("password", Check::min_chars(password, MIN_PASSWORD_CHARS));
        v.valid()
    }
}

// ============================================================================
// Login
// ============================================================================

/// The "log in" submission. The password is never serialized.
#[derive(Debug, Serialize)]
pub struct UserLoginForm {
    /// Email address.
    pub email: String,
    /// Plain-text password, only ever handed to the user store.
    #[serde(skip)]
    pub password: Secret<String>,
    /// Validation state.
    #[serde(flatten)]
    pub validator: Validator,
}

impl Default for UserLoginForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: Secret::new(String::new()),
            validator: Validator::default(),
        }
    }
}

impl UserLoginForm {
    /// Reads `email` and `password` from a submission.
    pub fn from_form_data(data: &FormData) -> Result<Self, FormError> {
        Ok(Self {
            email: data.text("email"),
            password: Secret::new(data.text("password")),
            validator: Validator::default(),
        })
    }

    /// Runs the structural checks; returns whether the form is valid.
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check("email", Check::not_blank(&self.email));
        v.check("email", Check::email(&self.email));
        v.check("password", Check::not_blank(self.password.expose_secret()));
        v.valid()
    }
}
