//! Middleware chain builder.
//!
//! An interceptor is a value implementing [`Middleware`]: it receives the
//! downstream handler and returns a new handler that may act before and
//! after calling it, or not call it at all. A [`Chain`] is an ordered list of
//! interceptors; [`Chain::then`] composes them around a terminal handler.
//!
//! # Composition Flow
//!
//! ```text
//! Chain [a, b, c] .then(h)
//!   ↓
//! a.wrap(b.wrap(c.wrap(h)))
//!   ↓
//! request:  a → b → c → h
//! response: h → c → b → a
//! ```
//!
//! Chains are cheap to clone and are extended by appending, so a route
//! group can share a prefix (for example session wiring) without
//! duplicating it.

use std::fmt;
use std::sync::Arc;

use super::{BoxHandler, Handler};

/// A request interceptor.
pub trait Middleware: Send + Sync {
    /// Stable name, used when inspecting a chain.
    fn name(&self) -> &'static str;

    /// Wraps `next`, returning the handler that runs this layer.
    fn wrap(&self, next: BoxHandler) -> BoxHandler;
}

/// A [`Middleware`] built from a closure.
///
/// Returned by [`layer_fn`].
pub struct FnMiddleware<F> {
    name: &'static str,
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(BoxHandler) -> BoxHandler + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        (self.f)(next)
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").field("name", &self.name).finish()
    }
}

/// Builds a named interceptor from a wrapping closure.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use http::header::HeaderValue;
/// use snippetbox_core::web::{layer_fn, BoxHandler, Chain, Handler, Request};
///
/// let tag = layer_fn("tag", |next: BoxHandler| -> BoxHandler {
///     Arc::new(move |req: Request| {
///         let mut resp = next.call(req);
///         resp.headers_mut().insert("x-tag", HeaderValue::from_static("1"));
///         resp
///     })
/// });
///
/// let chain = Chain::new().with(tag);
/// assert_eq!(chain.names(), vec!["tag"]);
/// ```
pub fn layer_fn<F>(name: &'static str, f: F) -> FnMiddleware<F>
where
    F: Fn(BoxHandler) -> BoxHandler + Send + Sync,
{
    FnMiddleware { name, f }
}

/// An ordered list of interceptors. The first layer added is outermost.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `layer` as the new innermost interceptor.
    pub fn with<M: Middleware + 'static>(mut self, layer: M) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    /// Returns a copy of this chain with `layer` appended. `self` is left
    /// untouched so it can keep serving as a shared prefix.
    pub fn append<M: Middleware + 'static>(&self, layer: M) -> Self {
        self.clone().with(layer)
    }

    /// Returns a copy of this chain followed by every layer of `other`.
    pub fn extend(&self, other: &Chain) -> Self {
        let mut layers = self.layers.clone();
        layers.extend(other.layers.iter().cloned());
        Self { layers }
    }

    /// Layer names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True when the chain has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Composes the chain around `handler`.
    pub fn then<H: Handler + 'static>(&self, handler: H) -> BoxHandler {
        self.then_boxed(Arc::new(handler))
    }

    /// Composes the chain around an already boxed handler.
    pub fn then_boxed(&self, handler: BoxHandler) -> BoxHandler {
        self.layers
            .iter()
            .rev()
            .fold(handler, |next, layer| layer.wrap(next))
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
