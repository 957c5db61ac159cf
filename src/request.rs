use std::collections::BTreeMap;
use std::net::IpAddr;

use http::{header, HeaderMap, Method, Uri};
use percent_encoding::percent_decode_str;

/// Body field that overrides the method of a POST request.
pub const METHOD_OVERRIDE_PARAM: &str = "_method";

/// Header that overrides the method of a POST request.
pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

/// Methods a POST may be overridden to. All of them are mutating.
const OVERRIDE_TARGETS: [Method; 3] = [Method::PUT, Method::PATCH, Method::DELETE];

/// Immutable view of one inbound HTTP request.
///
/// Every component of this crate takes a `&RequestContext` instead of
/// reaching into process-wide state. It is built once per request, usually
/// through [`RequestAdapter`](crate::web::RequestAdapter), and never mutated
/// afterwards.
///
/// # Examples
///
/// ```
/// use request_guard::web::{ExtractContext, RequestAdapter};
/// use http::Method;
///
/// let mut adapter = RequestAdapter::new("req-1".to_string());
/// adapter.set_method(Method::POST);
/// adapter.add_header("X-Requested-With", "XMLHttpRequest");
/// adapter.add_body_param("_method", "delete");
///
/// let request = adapter.extract_context();
/// assert!(request.is_delete());
/// assert!(request.is_ajax());
/// assert_eq!(request.raw_method(), &Method::POST);
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub(crate) request_id: String,
    pub(crate) raw_method: Method,
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) cookies: BTreeMap<String, String>,
    pub(crate) query: BTreeMap<String, String>,
    pub(crate) body: BTreeMap<String, String>,
    pub(crate) raw_body: Vec<u8>,
    pub(crate) remote_addr: Option<IpAddr>,
}

impl RequestContext {
    /// Assembles a context and resolves the effective method.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        request_id: String,
        raw_method: Method,
        uri: Uri,
        headers: HeaderMap,
        cookies: BTreeMap<String, String>,
        body: BTreeMap<String, String>,
        raw_body: Vec<u8>,
        remote_addr: Option<IpAddr>,
    ) -> Self {
        let query = uri.query().map(parse_form).unwrap_or_default();
        let method = effective_method(&raw_method, &headers, &body);

        Self {
            request_id,
            raw_method,
            method,
            uri,
            headers,
            cookies,
            query,
            body,
            raw_body,
            remote_addr,
        }
    }

    /// Returns the correlation ID used in log events.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the effective method, after `_method` / `X-HTTP-Method-Override`.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the method as sent on the wire.
    pub fn raw_method(&self) -> &Method {
        &self.raw_method
    }

    /// Returns the request target.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns all request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header as text. Non-visible-ASCII values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns the raw, unverified value of an inbound cookie.
    ///
    /// Use [`CookieJar`](crate::CookieJar) to read cookies whose integrity
    /// must be checked.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns all raw inbound cookies.
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    /// Returns a query string parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Returns a parsed body field.
    pub fn body_param(&self, name: &str) -> Option<&str> {
        self.body.get(name).map(String::as_str)
    }

    /// Returns a body field, falling back to the query string.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.body_param(name).or_else(|| self.query_param(name))
    }

    /// Returns the unparsed request body.
    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    /// Whether the effective method is GET.
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Whether the effective method is HEAD.
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// Whether the effective method is OPTIONS.
    pub fn is_options(&self) -> bool {
        self.method == Method::OPTIONS
    }

    /// Whether the effective method is POST.
    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }

    /// Whether the effective method is PUT.
    pub fn is_put(&self) -> bool {
        self.method == Method::PUT
    }

    /// Whether the effective method is PATCH.
    pub fn is_patch(&self) -> bool {
        self.method == Method::PATCH
    }

    /// Whether the effective method is DELETE.
    pub fn is_delete(&self) -> bool {
        self.method == Method::DELETE
    }

    /// Whether the method changes server state and therefore needs CSRF protection.
    pub fn is_mutating(&self) -> bool {
        self.is_post() || self.is_put() || self.is_patch() || self.is_delete()
    }

    /// Whether the request was sent by `XMLHttpRequest`.
    pub fn is_ajax(&self) -> bool {
        self.header("x-requested-with")
            .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    /// Whether the request came from a Flash player.
    pub fn is_flash(&self) -> bool {
        self.user_agent().is_some_and(|agent| {
            let agent = agent.to_ascii_lowercase();
            agent.contains("shockwave") || agent.contains("flash")
        })
    }

    /// Whether the request arrived over HTTPS, directly or through a proxy.
    pub fn is_secure(&self) -> bool {
        self.uri.scheme() == Some(&http::uri::Scheme::HTTPS)
            || self
                .header("x-forwarded-proto")
                .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
    }

    /// Returns the `User-Agent` header.
    pub fn user_agent(&self) -> Option<&str> {
        self.header(header::USER_AGENT.as_str())
    }

    /// Returns the `Referer` header.
    pub fn referrer(&self) -> Option<&str> {
        self.header(header::REFERER.as_str())
    }

    /// Returns the media type of the body, lower-cased and without parameters.
    pub fn content_type(&self) -> Option<String> {
        self.header(header::CONTENT_TYPE.as_str())
            .map(media_type)
            .filter(|value| !value.is_empty())
    }

    /// Returns the host (and port, if any) the request was sent to.
    pub fn host(&self) -> Option<&str> {
        self.header(header::HOST.as_str())
            .or_else(|| self.uri.authority().map(|authority| authority.as_str()))
    }

    /// Returns `scheme://host`, or `None` when the host is unknown.
    pub fn host_info(&self) -> Option<String> {
        let scheme = if self.is_secure() { "https" } else { "http" };
        self.host().map(|host| format!("{scheme}://{host}"))
    }

    /// Returns the decoded path without leading and trailing slashes.
    pub fn path_info(&self) -> String {
        percent_decode_str(self.uri.path())
            .decode_utf8_lossy()
            .trim_matches('/')
            .to_string()
    }

    /// Returns the path and query exactly as requested.
    pub fn request_uri(&self) -> &str {
        self.uri
            .path_and_query()
            .map_or_else(|| self.uri.path(), |pq| pq.as_str())
    }

    /// Returns the raw query string, empty when there is none.
    pub fn query_string(&self) -> &str {
        self.uri.query().unwrap_or_default()
    }

    /// Returns the peer address, or loopback when the server did not supply one.
    pub fn user_host_address(&self) -> IpAddr {
        self.remote_addr
            .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST))
    }
}

fn effective_method(raw: &Method, headers: &HeaderMap, body: &BTreeMap<String, String>) -> Method {
    if *raw != Method::POST {
        return raw.clone();
    }

    let requested = body.get(METHOD_OVERRIDE_PARAM).map(String::as_str).or_else(|| {
        headers
            .get(METHOD_OVERRIDE_HEADER)
            .and_then(|value| value.to_str().ok())
    });

    requested
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| Method::from_bytes(value.to_ascii_uppercase().as_bytes()).ok())
        .filter(|method| OVERRIDE_TARGETS.contains(method))
        .unwrap_or_else(|| raw.clone())
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Parses `application/x-www-form-urlencoded` data. Repeated keys keep the last value.
pub(crate) fn parse_form(input: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(input.as_bytes())
        .into_owned()
        .collect()
}

/// Parses body fields according to the content type.
///
/// Only flat forms and top-level JSON objects produce fields. Anything else,
/// including malformed input, yields no fields.
pub(crate) fn parse_body(content_type: Option<&str>, raw: &[u8]) -> BTreeMap<String, String> {
    let Some(content_type) = content_type.map(media_type) else {
        return BTreeMap::new();
    };

    if content_type == "application/x-www-form-urlencoded" {
        url::form_urlencoded::parse(raw).into_owned().collect()
    } else if content_type == "application/json" || content_type.ends_with("+json") {
        parse_json_object(raw)
    } else {
        BTreeMap::new()
    }
}

fn parse_json_object(raw: &[u8]) -> BTreeMap<String, String> {
    let Ok(serde_json::Value::Object(object)) = serde_json::from_slice(raw) else {
        return BTreeMap::new();
    };

    object
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(value) => value,
                serde_json::Value::Number(value) => value.to_string(),
                serde_json::Value::Bool(value) => value.to_string(),
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}
