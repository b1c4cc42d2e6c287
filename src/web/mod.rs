//! Transport-independent request pipeline.
//!
//! This module defines the boundary between an HTTP transport and the
//! application. It handles:
//! - The [`Handler`] capability every route and interceptor implements
//! - Ordered, inspectable middleware composition ([`Chain`])
//! - Method + path dispatch ([`Router`])
//! - The standard interceptors applied to every request
//!
//! # Design Principles
//!
//! 1. **No Transport Dependencies**: requests and responses are plain
//!    [`http`] types with an in-memory body. A server adapter converts to and
//!    from its own types at the edge.
//!
//! 2. **Explicit Composition**: interceptors are values in a [`Chain`], not
//!    nested closures, so their order can be inspected and tested without a
//!    live server.
//!
//! 3. **Explicit Context**: no global state. Per-request state (session,
//!    CSRF token, auth state, path parameters) travels in request
//!    extensions.
//!
//! # Example Flow
//!
//! ```
//! use http::StatusCode;
//! use snippetbox_core::web::{text, Chain, Handler, Request, Router, SecureHeaders};
//!
//! let router = Router::new()
//!     .get("/ping", |_req: Request| text(StatusCode::OK, "OK"))
//!     .unwrap();
//! let app = Chain::new().with(SecureHeaders).then(router);
//!
//! let resp = app.call(Request::new(Vec::new()));
//! assert_eq!(resp.status(), StatusCode::NOT_FOUND);
//! assert_eq!(resp.headers()["x-frame-options"], "deny");
//! ```

mod extract;
mod layers;
mod middleware;
mod response;
mod router;

use std::sync::Arc;

pub use extract::RequestExt;
pub use layers::{LogRequest, RecoverPanic, SecureHeaders};
pub use middleware::{layer_fn, Chain, FnMiddleware, Middleware};
pub use response::{add_vary, redirect, status_response, text};
pub use router::{PathParams, RouteError, Router};

/// Request body as buffered by the transport.
pub type Body = Vec<u8>;

/// An inbound request.
pub type Request = http::Request<Body>;

/// An outbound response.
pub type Response = http::Response<Body>;

/// Something that turns a request into a response.
///
/// Terminal handlers, the router and every wrapped interceptor implement
/// this. Failures are already classified into a response by the time a
/// handler returns.
pub trait Handler: Send + Sync {
    /// Handles one request.
    fn call(&self, req: Request) -> Response;
}

impl<F> Handler for F
where
    F: Fn(Request) -> Response + Send + Sync,
{
    fn call(&self, req: Request) -> Response {
        self(req)
    }
}

/// A shared, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;
