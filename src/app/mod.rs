//! The snippet-sharing application: dependencies, handlers and routes.
//!
//! Everything a handler needs is held by one [`Application`] value, built
//! once at startup and shared behind an `Arc`. There is no ambient global
//! state: configuration, stores and the renderer all flow from here.

mod handlers;
mod routes;
mod templates;

use std::sync::Arc;

use http::header::{self, HeaderValue};
use http::StatusCode;

pub use routes::standard_chain;
pub use templates::{FormState, JsonRenderer, Page, RenderError, Renderer, TemplateData};

use crate::config::Config;
use crate::error::Error;
use crate::models::{MemorySnippets, MemoryUsers, SnippetStore, UserStore};
use crate::session::{MemoryStore, SessionManager, SessionStore};
use crate::web::{Request, RequestExt, Response};

/// Session key of the one-time flash message.
pub const FLASH_KEY: &str = "flash";

/// Application dependencies.
pub struct Application {
    config: Config,
    snippets: Arc<dyn SnippetStore>,
    users: Arc<dyn UserStore>,
    sessions: Arc<SessionManager>,
    renderer: Arc<dyn Renderer>,
}

impl Application {
    /// Wires the application from its collaborators.
    pub fn new(
        config: Config,
        snippets: Arc<dyn SnippetStore>,
        users: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(session_store, config.session.clone()));
        Self {
            config,
            snippets,
            users,
            sessions,
            renderer,
        }
    }

    /// An application backed entirely by in-memory stores and the JSON
    /// renderer.
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemorySnippets::new()),
            Arc::new(MemoryUsers::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(JsonRenderer),
        )
    }

    /// Configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snippet persistence.
    pub fn snippets(&self) -> &Arc<dyn SnippetStore> {
        &self.snippets
    }

    /// User persistence.
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Session manager.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Template data common to every page: year, flash, auth state and the
    /// masked CSRF token.
    pub fn template_data(&self, req: &Request) -> TemplateData {
        TemplateData {
            flash: req.session().and_then(|s| s.pop_string(FLASH_KEY)),
            is_authenticated: req.auth_state().is_authenticated(),
            csrf_token: req
                .csrf_token()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            ..TemplateData::new()
        }
    }

    /// Renders `page` fully, then builds the response with `status`.
    pub fn render(
        &self,
        status: StatusCode,
        page: Page,
        data: &TemplateData,
    ) -> Result<Response, Error> {
        let body = self.renderer.render(page, data)?;
        let mut response = Response::new(body);
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.renderer.content_type()),
        );
        Ok(response)
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
