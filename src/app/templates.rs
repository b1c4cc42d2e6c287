use chrono::{Datelike, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::forms::{SnippetCreateForm, UserLoginForm, UserSignupForm};
use crate::models::Snippet;

/// Pages the application renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    /// Latest snippets.
    Home,
    /// One snippet.
    View,
    /// New snippet form.
    Create,
    /// Signup form.
    Signup,
    /// Login form.
    Login,
}

/// A form being (re)displayed, with its validation state.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FormState {
    /// New snippet.
    SnippetCreate(SnippetCreateForm),
    /// Signup.
    Signup(UserSignupForm),
    /// Login.
    Login(UserLoginForm),
}

/// Everything a page template can see.
#[derive(Debug, Default, Serialize)]
pub struct TemplateData {
    /// For the footer.
    pub current_year: i32,
    /// One-time message popped from the session.
    pub flash: Option<String>,
    /// Whether to show logged-in navigation.
    pub is_authenticated: bool,
    /// Masked anti-forgery token for hidden form fields.
    pub csrf_token: String,
    /// The snippet on a view page.
    pub snippet: Option<Snippet>,
    /// The snippets on the home page.
    pub snippets: Vec<Snippet>,
    /// The form on a form page.
    pub form: Option<FormState>,
}

impl TemplateData {
    /// Data with the current year filled in.
    pub fn new() -> Self {
        Self {
            current_year: Utc::now().year(),
            ..Self::default()
        }
    }
}

/// A failure while rendering, before any byte reached the client.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template data could not be encoded.
    #[error("encoding template data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Turns a page and its data into a response body.
///
/// Rendering completes into a buffer before the status is committed, so a
/// failure can still become a clean 500.
pub trait Renderer: Send + Sync {
    /// `Content-Type` of rendered bodies.
    fn content_type(&self) -> &'static str;

    /// Renders `page`.
    fn render(&self, page: Page, data: &TemplateData) -> Result<Vec<u8>, RenderError>;
}

/// Renders `{"page": ..., "data": ...}` JSON documents.
///
/// Stands in for HTML templates in tests and API clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct Document<'a> {
    page: Page,
    data: &'a TemplateData,
}

impl Renderer for JsonRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, page: Page, data: &TemplateData) -> Result<Vec<u8>, RenderError> {
        Ok(serde_json::to_vec(&Document { page, data })?)
    }
}
