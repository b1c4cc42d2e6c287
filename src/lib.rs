//! Request pipeline for a snippet-sharing web application.
//!
//! This crate provides everything between an HTTP transport and the
//! application's persistence layer:
//! - **Middleware chains**: ordered, inspectable interceptors composed around
//!   route handlers ([`web::Chain`])
//! - **Sessions**: token-keyed server-side state with write-on-dirty commits
//!   and token renewal ([`session`])
//! - **Authentication**: a two-state machine stored in the session and a
//!   guard for protected routes ([`auth`])
//! - **CSRF protection**: per-session tokens checked on unsafe methods
//!   ([`csrf`])
//! - **Validation**: declarative, first-error-wins form checks
//!   ([`validator`])
//! - **Routing**: method + path dispatch with 404/405 outcomes
//!   ([`web::Router`])
//!
//! # Core Types
//!
//! - [`Application`]: dependency struct that builds the full handler
//! - [`Session`]: one request's view of a session
//! - [`AuthState`]: `Anonymous` or `Authenticated(UserId)`
//! - [`Validator`]: accumulated field and non-field errors
//! - [`Secret<T>`]: wrapper that redacts credentials in logs/output
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use http::{header, StatusCode};
//! use snippetbox_core::{Application, Config};
//! use snippetbox_core::web::Handler;
//!
//! let app = Arc::new(Application::in_memory(Config::default()));
//! let handler = app.routes().expect("routes are well-formed");
//!
//! // Anonymous visitors are sent to the login page.
//! let req = http::Request::get("/snippet/create").body(Vec::new()).unwrap();
//! let resp = handler.call(req);
//! assert_eq!(resp.status(), StatusCode::SEE_OTHER);
//! assert_eq!(resp.headers()[header::LOCATION], "/user/login");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod auth;
pub mod config;
pub mod csrf;
mod error;
pub mod forms;
mod logging;
pub mod models;
mod request;
mod secret;
pub mod session;
pub mod token;
pub mod validator;
pub mod web;

pub use app::Application;
pub use auth::AuthState;
pub use config::Config;
pub use error::Error;
pub use logging::RequestLog;
pub use models::UserId;
pub use request::{ClientAddr, RequestId};
pub use secret::Secret;
pub use session::Session;
pub use validator::Validator;
