use http::header::{self, HeaderMap, HeaderValue};
use http::StatusCode;

use super::Response;
use crate::error::Error;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// A plain-text response.
pub fn text(status: StatusCode, body: impl Into<String>) -> Response {
    let mut response = Response::new(body.into().into_bytes());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

/// A response whose body is the status's canonical reason phrase.
pub fn status_response(status: StatusCode) -> Response {
    text(status, status.canonical_reason().unwrap_or("Unknown Status"))
}

/// A `303 See Other` redirect, the answer to every successful state change.
pub fn redirect(location: &str) -> Result<Response, Error> {
    let mut response = Response::new(Vec::new());
    *response.status_mut() = StatusCode::SEE_OTHER;
    response
        .headers_mut()
        .insert(header::LOCATION, HeaderValue::from_str(location)?);
    Ok(response)
}

/// Adds `value` to the `Vary` header unless it is already listed.
pub fn add_vary(headers: &mut HeaderMap, value: &'static str) {
    let present = headers.get_all(header::VARY).iter().any(|existing| {
        existing
            .to_str()
            .map(|s| s.split(',').any(|item| item.trim().eq_ignore_ascii_case(value)))
            .unwrap_or(false)
    });
    if !present {
        headers.append(header::VARY, HeaderValue::from_static(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_uses_reason_phrase() {
        let resp = status_response(StatusCode::NOT_FOUND);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.body(), b"Not Found");
        assert_eq!(resp.headers()[header::CONTENT_TYPE], TEXT_PLAIN);
    }

    #[test]
    fn redirect_is_see_other() {
        let resp = redirect("/snippet/view/3").unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/snippet/view/3");
    }

    #[test]
    fn vary_is_not_duplicated() {
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding, cookie"));
        add_vary(&mut headers, "Cookie");
        assert_eq!(headers.get_all(header::VARY).iter().count(), 1);

        add_vary(&mut headers, "Origin");
        assert_eq!(headers.get_all(header::VARY).iter().count(), 2);
    }
}
