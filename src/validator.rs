//! Declarative form validation.
//!
//! A [`Validator`] is a pure accumulator: handlers run every structural check
//! unconditionally, then consult [`Validator::valid`] before doing any work
//! that touches persisted state (a duplicate-email lookup, a credential
//! check). Checks never fail; they only record messages.
//!
//! Each field keeps at most one message, and it is always the message of the
//! *first* failing check. Later checks on the same field still run but do not
//! overwrite it, so the user sees the most basic problem first ("cannot be
//! blank" rather than "must be a valid email address").
//!
//! # Examples
//!
//! ```
//! use snippetbox_core::validator::{Check, Validator};
//!
//! let title = "";
//! let mut form = Validator::default();
//! form.check("title", Check::not_blank(title));
//! form.check("title", Check::max_chars(title, 100));
//!
//! assert!(!form.valid());
//! assert_eq!(form.field_error("title"), Some("This field cannot be blank"));
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Shape check for email addresses (the WHATWG "valid email address" grammar).
pub static EMAIL_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

/// Accumulated field-level and form-level validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validator {
    field_errors: BTreeMap<String, String>,
    non_field_errors: Vec<String>,
}

impl Validator {
    /// Creates an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true iff no field error and no non-field error was recorded.
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Records `message` under `key` unless the field already has a message.
    pub fn add_field_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(key.into())
            .or_insert_with(|| message.into());
    }

    /// Records an error that is not tied to a single field.
    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    /// Records `message` under `key` when `ok` is false (first failure wins).
    pub fn check_field(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_field_error(key, message);
        }
    }

    /// Applies a [`Check`] to the field `key`.
    pub fn check(&mut self, key: &str, check: Check) {
        if !check.ok {
            self.add_field_error(key, check.message);
        }
    }

    /// The recorded message for `key`, if any.
    pub fn field_error(&self, key: &str) -> Option<&str> {
        self.field_errors.get(key).map(String::as_str)
    }

    /// All field errors, ordered by field name.
    pub fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    /// All non-field errors in the order they were added.
    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }
}

/// The outcome of one rule applied to one value, with its fixed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    ok: bool,
    message: Cow<'static, str>,
}

impl Check {
    /// Wraps an arbitrary predicate result.
    pub fn new(ok: bool, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            ok,
            message: message.into(),
        }
    }

    /// Value contains at least one non-whitespace character.
    pub fn not_blank(value: &str) -> Self {
        Self::new(not_blank(value), "This field cannot be blank")
    }

    /// Value has at most `n` characters.
    pub fn max_chars(value: &str, n: usize) -> Self {
        Self::new(
            max_chars(value, n),
            format!("This field cannot be more than {n} characters long"),
        )
    }

    /// Value has at least `n` characters.
    pub fn min_chars(value: &str, n: usize) -> Self {
        Self::new(
            min_chars(value, n),
            format!("This field must be at least {n} characters long"),
        )
    }

    /// Value is one of `allowed`.
    pub fn permitted<T: PartialEq + Display>(value: &T, allowed: &[T]) -> Self {
        Self::new(
            permitted(value, allowed),
            format!("This field must equal {}", human_list(allowed)),
        )
    }

    /// Value lies in `min..=max`.
    pub fn in_range<T: PartialOrd + Display>(value: &T, min: &T, max: &T) -> Self {
        Self::new(
            in_range(value, min, max),
            format!("This field must be between {min} and {max}"),
        )
    }

    /// Value has the shape of an email address.
    pub fn email(value: &str) -> Self {
        Self::new(
            matches(value, &EMAIL_RX),
            "This field must be a valid email address",
        )
    }

    /// Value matches `rx`.
    pub fn matches(value: &str, rx: &Regex, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(matches(value, rx), message)
    }

    /// Whether the rule passed.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// The message recorded when the rule fails.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// True if `value` is not empty after trimming whitespace.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True if `value` has no more than `n` characters (not bytes).
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True if `value` has at least `n` characters (not bytes).
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// True if `value` is a member of `allowed`.
pub fn permitted<T: PartialEq>(value: &T, allowed: &[T]) -> bool {
    allowed.contains(value)
}

/// True if `min <= value <= max`.
pub fn in_range<T: PartialOrd>(value: &T, min: &T, max: &T) -> bool {
    value >= min && value <= max
}

/// True if `rx` matches `value`.
pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

// "1, 7 or 365"
fn human_list<T: Display>(items: &[T]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => {
            let head: Vec<String> = init.iter().map(ToString::to_string).collect();
            format!("{} or {}", head.join(", "), last)
        }
    }
}
