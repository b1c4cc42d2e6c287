use std::sync::Arc;

use http::header::{self, HeaderValue};

use super::manager::SessionManager;
use crate::error::Error;
use crate::web::{add_vary, BoxHandler, Middleware, Request, RequestExt, Response};

/// Loads the request's session before the rest of the chain runs and
/// commits it afterwards.
///
/// The loaded [`Session`](super::Session) is placed in request extensions.
/// When the commit writes the session, the response gets the cookie plus
/// `Vary: Cookie` and `Cache-Control: no-cache="Set-Cookie"`. A store or
/// payload failure on either side turns the whole response into a 500.
#[derive(Debug, Clone)]
pub struct LoadAndSave {
    manager: Arc<SessionManager>,
}

impl LoadAndSave {
    /// Creates the layer.
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

impl Middleware for LoadAndSave {
    fn name(&self) -> &'static str {
        "load_and_save"
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let manager = Arc::clone(&self.manager);
        Arc::new(move |mut req: Request| -> Response {
            let token = req.cookie(&manager.config().cookie_name);
            let session = match manager.load(token.as_deref()) {
                Ok(session) => session,
                Err(err) => return Error::from(err).into_response(),
            };
            req.extensions_mut().insert(session.clone());

            let mut response = next.call(req);

            let cookie = match manager.commit(&session) {
                Ok(Some(cookie)) => cookie,
                Ok(None) => return response,
                Err(err) => return Error::from(err).into_response(),
            };
            let value = match cookie.to_header_value() {
                Ok(value) => value,
                Err(err) => return Error::from(err).into_response(),
            };

            let headers = response.headers_mut();
            headers.append(header::SET_COOKIE, value);
            add_vary(headers, "Cookie");
            headers.append(
                header::CACHE_CONTROL,
                HeaderValue::from_static(r#"no-cache="Set-Cookie""#),
            );
            response
        })
    }
}
