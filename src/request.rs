use std::fmt;
use std::net::SocketAddr;

use crate::token::generate_request_id;

/// Correlation id for one request.
///
/// Inserted into request extensions by
/// [`LogRequest`](crate::web::LogRequest); every log line emitted while the
/// request is in flight carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Allocates a fresh random id.
    pub fn generate() -> Self {
        Self(generate_request_id())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Peer address, inserted into request extensions by the transport when it
/// knows one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);
