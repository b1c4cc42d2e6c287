use http::header::{self, HeaderValue, InvalidHeaderValue};
use http::{Method, StatusCode};
use thiserror::Error;

use crate::app::RenderError;
use crate::csrf::CsrfError;
use crate::forms::FormError;
use crate::models::ModelError;
use crate::session::SessionError;
use crate::web::{status_response, Response};

/// Errors that end a request early.
///
/// Each variant maps to exactly one status code via [`Error::status`].
/// Validation failures are not errors; they are accumulated in a
/// [`Validator`](crate::validator::Validator) and re-rendered as 422.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed request body or parameter.
    #[error("bad request: {0}")]
    ClientInput(String),

    /// Unknown route or unknown resource.
    #[error("not found")]
    NotFound,

    /// The path exists but not for this method.
    #[error("method not allowed")]
    MethodNotAllowed {
        /// Methods the path does support.
        allowed: Vec<Method>,
    },

    /// Anti-forgery check failed.
    #[error(transparent)]
    Csrf(#[from] CsrfError),

    /// Session store or payload failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Persistence adapter failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Rendering failed before anything was written.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// A header value could not be encoded.
    #[error(transparent)]
    HeaderValue(#[from] InvalidHeaderValue),

    /// Anything else, including recovered panics.
    #[error("unexpected fault: {0}")]
    Fault(String),
}

impl From<FormError> for Error {
    fn from(err: FormError) -> Self {
        Error::ClientInput(err.to_string())
    }
}

impl Error {
    /// HTTP status this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::ClientInput(_) | Error::Csrf(_) => StatusCode::BAD_REQUEST,
            Error::NotFound | Error::Model(ModelError::NoRecord) => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Error::Session(_)
            | Error::Model(_)
            | Error::Render(_)
            | Error::HeaderValue(_)
            | Error::Fault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts the error into the response the client sees.
    ///
    /// Server errors are logged with their full chain; the body only ever
    /// carries the generic status text.
    pub fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                error = %self,
                source = ?std::error::Error::source(&self),
                "server error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "client error");
        }

        let mut response = status_response(status);
        if let Error::MethodNotAllowed { allowed } = &self {
            let list = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&list) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}
