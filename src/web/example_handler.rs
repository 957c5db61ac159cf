//! Example handlers demonstrating the request pipeline end to end.
//!
//! Shows realistic handler flows that combine [`protect`], content
//! negotiation and response building without a running HTTP server.
//!
//! **These examples are for documentation and testing only.**

use std::sync::Arc;

use http::{header, Response, StatusCode};
use serde_json::json;

use crate::config::Config;
use crate::error::{Error, HttpError};
use crate::negotiate::AcceptNegotiator;
use crate::request::RequestContext;
use crate::response::{header_safe, redirect};
use crate::signing::Signer;

use super::protect;

/// Languages the example pages are available in. The first one is the default.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "de", "fr"];

/// Renders the comment form.
///
/// The token is embedded in a hidden field for HTML clients and returned as
/// a JSON property for API clients. The response carries the token cookie
/// when one was issued.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use request_guard::web::{example_handler::handle_form_page, RequestAdapter, ExtractContext};
/// use request_guard::{Config, KeyedHashSigner};
///
/// let signer = Arc::new(KeyedHashSigner::derive("docs", b"secret"));
/// let mut adapter = RequestAdapter::new("req-form-001".to_string());
/// adapter.add_header("Accept", "application/json");
///
/// let response = handle_form_page(&adapter.extract_context(), &Config::default(), signer).unwrap();
/// assert_eq!(response.headers()["content-type"], "application/json");
/// assert!(response.headers().contains_key("set-cookie"));
/// ```
pub fn handle_form_page(
    request: &RequestContext,
    config: &Config,
    signer: Arc<dyn Signer>,
) -> Result<Response<Vec<u8>>, Error> {
    let protected = protect(request, config, signer)?;
    let negotiator = AcceptNegotiator::new(request);

    let language = negotiator
        .preferred_language_from(SUPPORTED_LANGUAGES)
        .unwrap_or(SUPPORTED_LANGUAGES[0]);

    let wants_json =
        !negotiator.accepts("text/html") || prefers(&negotiator, "application/json");

    let (content_type, body) = if wants_json {
        let body = json!({
            "language": language,
            "token_name": protected.token_name(),
            "token": protected.token(),
        });
        ("application/json", body.to_string())
    } else {
        let body = format!(
            "<!doctype html><html lang=\"{language}\"><form method=\"post\" action=\"/comments\">\
             <input type=\"hidden\" name=\"{}\" value=\"{}\">\
             <textarea name=\"comment\"></textarea></form></html>",
            escape_html(protected.token_name()),
            escape_html(protected.token()),
        );
        ("text/html; charset=utf-8", body)
    };

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LANGUAGE, header_safe(language)?)
        .header(header::VARY, "Accept, Accept-Language")
        .body(body.into_bytes())?;
    protected.write_headers(response.headers_mut())?;

    tracing::debug!(
        request_id = %request.request_id(),
        content_type,
        language,
        "rendered form page"
    );

    Ok(response)
}

/// Accepts a comment submission.
///
/// Rejected with `400` unless the CSRF token is echoed back. A valid
/// submission redirects to the form page (303, post/redirect/get).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use request_guard::web::{example_handler::handle_submit, RequestAdapter, ExtractContext};
/// use request_guard::{Config, KeyedHashSigner};
///
/// let signer = Arc::new(KeyedHashSigner::derive("docs", b"secret"));
/// let mut adapter = RequestAdapter::new("req-submit-001".to_string());
/// adapter.set_method(http::Method::POST);
/// adapter.add_cookie("CSRF_TOKEN", "t0k3n");
/// adapter.add_body_param("CSRF_TOKEN", "t0k3n");
/// adapter.add_body_param("comment", "hello");
///
/// let response = handle_submit(&adapter.extract_context(), &Config::default(), signer).unwrap();
/// assert_eq!(response.status(), 303);
/// ```
pub fn handle_submit(
    request: &RequestContext,
    config: &Config,
    signer: Arc<dyn Signer>,
) -> Result<Response<Vec<u8>>, Error> {
    let protected = protect(request, config, signer)?;

    let comment = request
        .body_param("comment")
        .map(str::trim)
        .filter(|comment| !comment.is_empty())
        .ok_or_else(|| HttpError::bad_request("missing comment"))?;

    tracing::info!(
        request_id = %request.request_id(),
        length = comment.len(),
        "accepted comment"
    );

    let mut response = redirect("/comments", StatusCode::SEE_OTHER)?;
    protected.write_headers(response.headers_mut())?;

    Ok(response)
}

/// Renders an [`HttpError`] as a plain-text response.
pub fn error_response(error: &HttpError) -> Response<Vec<u8>> {
    let mut response = Response::new(error.message().as_bytes().to_vec());
    *response.status_mut() = error.status();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Escapes text for use inside an HTML attribute or element.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

// JSON wins only when it is ranked strictly above HTML.
fn prefers(negotiator: &AcceptNegotiator<'_>, mime: &str) -> bool {
    let rank = |mime: &str| {
        negotiator
            .accept_types()
            .iter()
            .position(|entry| entry.q > 0.0 && entry.matches(mime))
    };

    match (rank(mime), rank("text/html")) {
        (Some(wanted), Some(html)) => wanted < html,
        (Some(_), None) => true,
        _ => false,
    }
}
