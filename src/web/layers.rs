//! Interceptors applied to every request.
//!
//! The standard chain is `[RecoverPanic, LogRequest, SecureHeaders]`, in that
//! order: recovery is outermost so it also catches faults raised by logging.
//! Headers that [`SecureHeaders`] sets are also registered with the
//! recovery layer before the handler runs, so a 500 built after a panic
//! still carries them.

use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use parking_lot::Mutex;

use super::{status_response, BoxHandler, Middleware, Request, Response};
use crate::request::{ClientAddr, RequestId};

// ============================================================================
// Panic recovery
// ============================================================================

// Headers owed to the response before the downstream handler runs.
#[derive(Clone, Default)]
struct EarlyHeaders(Arc<Mutex<HeaderMap>>);

/// Turns a panic anywhere downstream into a generic 500.
///
/// The panic message and a captured backtrace are logged; the response
/// carries `Connection: close` so the transport drops the connection rather
/// than reuse it after a fault, plus any headers inner layers registered
/// before the fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoverPanic;

impl Middleware for RecoverPanic {
    fn name(&self) -> &'static str {
        "recover_panic"
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(move |mut req: Request| -> Response {
            let early = EarlyHeaders::default();
            req.extensions_mut().insert(early.clone());

            match panic::catch_unwind(AssertUnwindSafe(|| next.call(req))) {
                Ok(response) => response,
                Err(payload) => {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic payload".to_string());
                    let backtrace = Backtrace::force_capture();
                    tracing::error!(panic = %message, %backtrace, "recovered from panic");

                    let mut response = status_response(StatusCode::INTERNAL_SERVER_ERROR);
                    let headers = response.headers_mut();
                    for (name, value) in early.0.lock().iter() {
                        headers.entry(name).or_insert_with(|| value.clone());
                    }
                    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
                    response
                }
            }
        })
    }
}

// ============================================================================
// Request logging
// ============================================================================

/// Assigns a [`RequestId`], runs the rest of the chain inside a `request`
/// span and logs one line per request once the response is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequest;

impl Middleware for LogRequest {
    fn name(&self) -> &'static str {
        "log_request"
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(move |mut req: Request| -> Response {
            let request_id = match req.extensions().get::<RequestId>() {
                Some(id) => id.clone(),
                None => {
                    let id = RequestId::generate();
                    req.extensions_mut().insert(id.clone());
                    id
                }
            };

            let method = req.method().clone();
            let uri = req.uri().clone();
            let version = req.version();
            let remote_addr = req
                .extensions()
                .get::<ClientAddr>()
                .map(|addr| addr.0.to_string())
                .unwrap_or_else(|| "-".to_string());

            let span = tracing::info_span!("request", request_id = %request_id, %method, %uri);
            let _guard = span.enter();

            let response = next.call(req);

            tracing::info!(
                remote_addr = %remote_addr,
                proto = ?version,
                %method,
                %uri,
                status = response.status().as_u16(),
                "handled request"
            );
            response
        })
    }
}

// ============================================================================
// Security headers
// ============================================================================

/// Headers every response carries unless a downstream layer set its own.
pub const SECURE_HEADERS: [(HeaderName, &str); 5] = [
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
    ),
    (header::REFERRER_POLICY, "origin-when-cross-origin"),
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "deny"),
    (header::X_XSS_PROTECTION, "0"),
];

/// Adds [`SECURE_HEADERS`] to every response, including the 500 that an
/// outer [`RecoverPanic`] sends when the handler panics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureHeaders;

impl Middleware for SecureHeaders {
    fn name(&self) -> &'static str {
        "secure_headers"
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(move |req: Request| -> Response {
            if let Some(early) = req.extensions().get::<EarlyHeaders>() {
                let mut pending = early.0.lock();
                for (name, value) in SECURE_HEADERS {
                    pending
                        .entry(name)
                        .or_insert_with(|| HeaderValue::from_static(value));
                }
            }

            let mut response = next.call(req);
            let headers = response.headers_mut();
            for (name, value) in SECURE_HEADERS {
                headers
                    .entry(name)
                    .or_insert_with(|| HeaderValue::from_static(value));
            }
            response
        })
    }
}
