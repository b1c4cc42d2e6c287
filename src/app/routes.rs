use std::sync::Arc;

use http::Method;

use super::{handlers, Application};
use crate::auth::{Authenticate, RequireAuthentication};
use crate::csrf::CsrfGuard;
use crate::error::Error;
use crate::session::LoadAndSave;
use crate::web::{
    BoxHandler, Chain, LogRequest, RecoverPanic, Request, Response, RouteError, Router,
    SecureHeaders,
};

type Endpoint = fn(&Application, Request) -> Result<Response, Error>;

/// Interceptors wrapped around the router itself: recovery outermost.
pub fn standard_chain() -> Chain {
    Chain::new()
        .with(RecoverPanic)
        .with(LogRequest)
        .with(SecureHeaders)
}

impl Application {
    /// Session, CSRF and auth-state layers shared by every page route.
    pub fn dynamic_chain(&self) -> Chain {
        Chain::new()
            .with(LoadAndSave::new(Arc::clone(&self.sessions)))
            .with(
                CsrfGuard::new(self.config.csrf.clone())
                    .with_body_limit(self.config.max_form_bytes),
            )
            .with(Authenticate::new(Arc::clone(&self.users)))
    }

    /// [`dynamic_chain`](Self::dynamic_chain) plus the authentication guard.
    pub fn protected_chain(&self) -> Chain {
        self.dynamic_chain()
            .append(RequireAuthentication::new(self.config.login_path.as_str()))
    }

    /// Builds the complete request handler.
    ///
    /// | Method | Path                | Chain     |
    /// |--------|---------------------|-----------|
    /// | GET    | `/`                 | dynamic   |
    /// | GET    | `/snippet/view/:id` | dynamic   |
    /// | GET    | `/snippet/create`   | protected |
    /// | POST   | `/snippet/create`   | protected |
    /// | GET    | `/user/signup`      | dynamic   |
    /// | POST   | `/user/signup`      | dynamic   |
    /// | GET    | `/user/login`       | dynamic   |
    /// | POST   | `/user/login`       | dynamic   |
    /// | POST   | `/user/logout`      | protected |
    pub fn routes(self: &Arc<Self>) -> Result<BoxHandler, RouteError> {
        let dynamic = self.dynamic_chain();
        let protected = self.protected_chain();

        let public = |endpoint: Endpoint| dynamic.then_boxed(self.endpoint(endpoint));
        let private = |endpoint: Endpoint| protected.then_boxed(self.endpoint(endpoint));

        let router = Router::new()
            .route_boxed(Method::GET, "/", public(handlers::home))?
            .route_boxed(Method::GET, "/snippet/view/:id", public(handlers::snippet_view))?
            .route_boxed(Method::GET, "/snippet/create", private(handlers::snippet_create))?
            .route_boxed(Method::POST, "/snippet/create", private(handlers::snippet_create_post))?
            .route_boxed(Method::GET, "/user/signup", public(handlers::user_signup))?
            .route_boxed(Method::POST, "/user/signup", public(handlers::user_signup_post))?
            .route_boxed(Method::GET, "/user/login", public(handlers::user_login))?
            .route_boxed(Method::POST, "/user/login", public(handlers::user_login_post))?
            .route_boxed(Method::POST, "/user/logout", private(handlers::user_logout_post))?;

        Ok(standard_chain().then(router))
    }

    fn endpoint(self: &Arc<Self>, endpoint: Endpoint) -> BoxHandler {
        let app = Arc::clone(self);
        Arc::new(move |req: Request| endpoint(&app, req).unwrap_or_else(Error::into_response))
    }
}
