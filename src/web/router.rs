//! Method + path dispatch.
//!
//! Patterns are `/`-separated segments; a segment starting with `:` is a
//! named parameter matching exactly one non-empty path segment. A literal
//! segment takes priority over a parameter at the same position, so
//! `/snippet/view/latest` wins over `/snippet/view/:id` for that path.
//!
//! Matched parameters are placed in request extensions as [`PathParams`],
//! as raw (percent-decoded) strings. Typed parsing is the handler's job.

use http::Method;
use thiserror::Error;

use super::{status_response, BoxHandler, Handler, Request, Response};
use crate::error::Error;
use crate::forms::percent_decode_path;

/// A route that cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern is not a well-formed path pattern.
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A route with the same method and pattern shape already exists.
    #[error("route {method} {pattern} conflicts with an existing route")]
    Conflict {
        /// Method of the rejected route.
        method: Method,
        /// Pattern of the rejected route.
        pattern: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Param(_), Segment::Param(_)) => true,
            _ => false,
        }
    }
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, RouteError> {
    let invalid = |reason| RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };

    let rest = pattern
        .strip_prefix('/')
        .ok_or_else(|| invalid("must start with '/'"))?;
    if rest.is_empty() {
        return Ok(Vec::new());
    }

    rest.split('/')
        .map(|seg| match seg.strip_prefix(':') {
            _ if seg.is_empty() => Err(invalid("empty segment")),
            Some("") => Err(invalid("unnamed parameter")),
            Some(name) => Ok(Segment::Param(name.to_string())),
            None => Ok(Segment::Literal(seg.to_string())),
        })
        .collect()
}

/// Named path parameters captured by the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    /// The value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

struct Route {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    handler: BoxHandler,
}

impl Route {
    fn matches(&self, path: &[&str]) -> Option<PathParams> {
        if self.segments.len() != path.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, raw) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(lit) if lit == raw => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if raw.is_empty() => return None,
                Segment::Param(name) => {
                    let value = percent_decode_path(raw).unwrap_or_else(|| raw.to_string());
                    params.push((name.clone(), value));
                }
            }
        }
        Some(PathParams(params))
    }

    // Lower sorts first: literal segments beat parameters position by position.
    fn rank(&self) -> Vec<u8> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(_) => 0,
                Segment::Param(_) => 1,
            })
            .collect()
    }
}

/// Outcome of a route lookup.
pub(crate) enum Lookup<'a> {
    Found(&'a BoxHandler, PathParams),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Dispatches requests to registered handlers.
///
/// Unmatched paths are answered 404; a path registered only for other
/// methods is answered 405 with an `Allow` header.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` requests matching `pattern`.
    pub fn route<H: Handler + 'static>(
        self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<Self, RouteError> {
        self.route_boxed(method, pattern, std::sync::Arc::new(handler))
    }

    /// Same as [`route`](Self::route) for an already boxed handler.
    pub fn route_boxed(
        mut self,
        method: Method,
        pattern: &str,
        handler: BoxHandler,
    ) -> Result<Self, RouteError> {
        let segments = parse_pattern(pattern)?;

        let conflict = self.routes.iter().any(|r| {
            r.method == method
                && r.segments.len() == segments.len()
                && r.segments.iter().zip(&segments).all(|(a, b)| a.same_shape(b))
        });
        if conflict {
            return Err(RouteError::Conflict {
                method,
                pattern: pattern.to_string(),
            });
        }

        tracing::debug!(%method, pattern, "route registered");
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            segments,
            handler,
        });
        Ok(self)
    }

    /// Registers a `GET` route.
    pub fn get<H: Handler + 'static>(self, pattern: &str, handler: H) -> Result<Self, RouteError> {
        self.route(Method::GET, pattern, handler)
    }

    /// Registers a `POST` route.
    pub fn post<H: Handler + 'static>(self, pattern: &str, handler: H) -> Result<Self, RouteError> {
        self.route(Method::POST, pattern, handler)
    }

    /// Registered `(method, pattern)` pairs, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|r| (&r.method, r.pattern.as_str()))
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Lookup<'_> {
        let parts: Vec<&str> = match path.strip_prefix('/') {
            Some("") => Vec::new(),
            Some(rest) => rest.split('/').collect(),
            None => return Lookup::NotFound,
        };

        let mut best: Option<(&Route, PathParams)> = None;
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.matches(&parts) else {
                continue;
            };
            if &route.method != method {
                allowed.push(route.method.clone());
                continue;
            }
            let better = best
                .as_ref()
                .map_or(true, |(current, _)| route.rank() < current.rank());
            if better {
                best = Some((route, params));
            }
        }

        match best {
            Some((route, params)) => Lookup::Found(&route.handler, params),
            None if allowed.is_empty() => Lookup::NotFound,
            None => {
                allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                allowed.dedup();
                Lookup::MethodNotAllowed(allowed)
            }
        }
    }
}

impl Handler for Router {
    fn call(&self, mut req: Request) -> Response {
        let path = req.uri().path().to_string();
        match self.lookup(req.method(), &path) {
            Lookup::Found(handler, params) => {
                req.extensions_mut().insert(params);
                handler.call(req)
            }
            Lookup::MethodNotAllowed(allowed) => {
                Error::MethodNotAllowed { allowed }.into_response()
            }
            Lookup::NotFound => status_response(http::StatusCode::NOT_FOUND),
        }
    }
}
