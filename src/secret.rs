use std::fmt;

/// A wrapper that keeps credentials and tokens out of logs and rendered output.
///
/// Passwords submitted through forms, session tokens and CSRF tokens all pass
/// through request-handling code that logs liberally. Wrapping them in
/// `Secret<T>` means a stray `{:?}` in a `tracing` call prints `[REDACTED]`
/// instead of the credential. The value is reachable only through
/// [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use snippetbox_core::Secret;
///
/// let password = Secret::new("pa55word".to_string());
/// assert_eq!(format!("{:?}", password), "[REDACTED]");
/// assert_eq!(password.expose_secret(), "pa55word");
/// ```
// Do NOT derive Clone, Copy, Default or Serialize.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the wrapped value.
    ///
    /// Call sites should hand the result straight to the consumer (a password
    /// hasher, a constant-time comparison, a cookie) and never format it.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
