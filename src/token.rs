//! Unguessable token generation and comparison.
//!
//! Session tokens, CSRF tokens and request ids all come from the operating
//! system's CSPRNG and are hex encoded so they are valid cookie values and
//! header values without further escaping.

use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes in a session or CSRF token.
pub const TOKEN_BYTES: usize = 32;

/// Number of random bytes in a request id.
const REQUEST_ID_BYTES: usize = 8;

/// Returns `n` fresh random bytes from the OS CSPRNG.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Generates a new hex-encoded session token (256 bits of entropy).
pub fn generate_token() -> String {
    hex::encode(random_bytes(TOKEN_BYTES))
}

/// Generates a short request id for log correlation.
///
/// Not a security boundary; it only needs to be unique enough to tell
/// concurrent requests apart in the logs.
pub fn generate_request_id() -> String {
    hex::encode(random_bytes(REQUEST_ID_BYTES))
}

/// Compares two byte strings without short-circuiting on the first mismatch.
///
/// Lengths are compared first; token lengths are public so that branch leaks
/// nothing useful.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
