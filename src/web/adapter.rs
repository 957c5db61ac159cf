//! Request adapter for mapping HTTP requests to a [`RequestContext`].

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, Method, Request, Uri};
use rand::{distributions::Alphanumeric, Rng};

use crate::request::{parse_body, RequestContext};

use super::ExtractContext;

/// Header carrying a request ID assigned by an upstream proxy.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Adapter for converting framework-specific HTTP requests into a [`RequestContext`].
///
/// `RequestAdapter` is the integration point between a web server and this
/// crate. It can be filled from an [`http::Request`] with
/// [`from_http`](Self::from_http), or assembled field by field by servers
/// that do not use the `http` types (and by tests).
///
/// # Examples
///
/// ```
/// use request_guard::web::{ExtractContext, RequestAdapter};
///
/// let mut adapter = RequestAdapter::new("req-12345".to_string());
/// adapter.add_cookie("theme", "dark");
/// adapter.add_header("Accept-Language", "en");
///
/// let request = adapter.extract_context();
/// assert_eq!(request.request_id(), "req-12345");
/// assert_eq!(request.cookie("theme"), Some("dark"));
/// assert_eq!(request.header("accept-language"), Some("en"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    request_id: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    /// Raw transport values, as sent by the client
    cookies: BTreeMap<String, String>,
    /// Explicit body fields, merged over whatever the raw body parses to
    body_params: BTreeMap<String, String>,
    raw_body: Vec<u8>,
    remote_addr: Option<IpAddr>,
}

impl RequestAdapter {
    /// Creates an adapter for a `GET /` request with the given request ID.
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            cookies: BTreeMap::new(),
            body_params: BTreeMap::new(),
            raw_body: Vec::new(),
            remote_addr: None,
        }
    }

    /// Copies everything this crate needs out of an [`http::Request`].
    ///
    /// The request ID is taken from `X-Request-Id` when present and generated
    /// otherwise. A [`SocketAddr`] request extension is used as the peer address.
    pub fn from_http<B>(request: &Request<B>) -> Self
    where
        B: AsRef<[u8]>,
    {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map_or_else(generate_request_id, str::to_string);

        Self {
            request_id,
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
            cookies: parse_cookie_headers(request.headers()),
            body_params: BTreeMap::new(),
            raw_body: request.body().as_ref().to_vec(),
            remote_addr: request
                .extensions()
                .get::<SocketAddr>()
                .map(SocketAddr::ip),
        }
    }

    /// Sets the method as sent by the client, before any override.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Sets the request URI, including the query string.
    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    /// Appends a header. Names or values that are not valid HTTP are skipped.
    pub fn add_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::debug!(
                request_id = %self.request_id,
                header = %name,
                "skipping invalid header"
            ),
        }
    }

    /// Adds an inbound cookie with its raw transport value.
    pub fn add_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    /// Adds a parsed body field.
    pub fn add_body_param(&mut self, name: &str, value: &str) {
        self.body_params.insert(name.to_string(), value.to_string());
    }

    /// Sets the raw body. It is parsed according to the `Content-Type` header
    /// when the context is extracted.
    pub fn set_raw_body(&mut self, body: impl Into<Vec<u8>>) {
        self.raw_body = body.into();
    }

    /// Sets the peer address reported by `user_host_address`.
    pub fn set_remote_addr(&mut self, addr: IpAddr) {
        self.remote_addr = Some(addr);
    }

    /// Returns a reference to the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl ExtractContext for RequestAdapter {
    fn extract_context(&self) -> RequestContext {
        let content_type = self
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());

        let mut body = parse_body(content_type, &self.raw_body);
        body.extend(
            self.body_params
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        RequestContext::assemble(
            self.request_id.clone(),
            self.method.clone(),
            self.uri.clone(),
            self.headers.clone(),
            self.cookies.clone(),
            body,
            self.raw_body.clone(),
            self.remote_addr,
        )
    }
}

/// Parses all `Cookie` headers. The first occurrence of a name wins.
fn parse_cookie_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();

    for header in headers.get_all(header::COOKIE) {
        let Ok(value_str) = header.to_str() else {
            continue;
        };

        for cookie in cookie::Cookie::split_parse_encoded(value_str) {
            let Ok(cookie) = cookie else {
                continue;
            };

            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value().to_string());
        }
    }

    cookies
}

fn generate_request_id() -> String {
    rand::thread_rng()
        .sample_iter(Alphanumeric)
        .map(char::from)
        .take(16)
        .collect()
}
