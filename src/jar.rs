//! Request-scoped cookie collection with optional tamper validation.
//!
//! The jar reads every inbound cookie exactly once when it is built. With
//! validation enabled, each transport value must be a signed envelope
//! produced by the injected [`Signer`]; anything else is treated as if the
//! client never sent it.
//!
//! Writes never touch the request. They are recorded as outbound
//! instructions and rendered as `Set-Cookie` header values, one per cookie
//! name, last write wins.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cookie::time::{Duration, OffsetDateTime};
use http::{header, HeaderMap, HeaderValue};

use crate::config::{CookieAttributes, CookieJarConfig, SameSite};
use crate::error::Error;
use crate::request::RequestContext;
use crate::signing::Signer;

/// An immutable cookie value.
///
/// Identity is the name. Changing a cookie means building a new one and
/// handing it to [`CookieJar::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    expires: Option<OffsetDateTime>,
    path: String,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl Cookie {
    /// Creates a session cookie scoped to `/`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Creates a cookie carrying the configured attributes.
    ///
    /// A configured lifetime is turned into an absolute expiry relative to now.
    /// A lifetime whose expiry cannot be represented yields a session cookie.
    pub fn with_attributes(
        name: impl Into<String>,
        value: impl Into<String>,
        attributes: &CookieAttributes,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: attributes
                .lifetime_secs
                .and_then(|secs| OffsetDateTime::now_utc().checked_add(Duration::seconds(secs))),
            path: attributes.path.clone(),
            domain: attributes.domain.clone(),
            secure: attributes.secure,
            http_only: attributes.http_only,
            same_site: attributes.same_site,
        }
    }

    /// Returns a copy with an absolute expiry.
    #[must_use]
    pub fn expires_at(mut self, expires: OffsetDateTime) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded cookie value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Expiry instant, `None` for a session cookie.
    pub fn expires(&self) -> Option<OffsetDateTime> {
        self.expires
    }

    /// Path scope.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Domain scope, `None` for a host-only cookie.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Whether the cookie is only sent over HTTPS.
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Whether the cookie is hidden from client-side scripts.
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    /// `SameSite` policy, if any.
    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    fn to_transport(&self, value: String) -> cookie::Cookie<'static> {
        let mut builder = cookie::Cookie::build((self.name.clone(), value))
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only);

        if let Some(ref domain) = self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(expires) = self.expires {
            builder = builder.expires(expires);
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site.into());
        }

        builder.build()
    }
}

/// Name → [`Cookie`] mapping for one request.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use request_guard::{Cookie, CookieJar, CookieJarConfig, KeyedHashSigner};
/// use request_guard::web::{ExtractContext, RequestAdapter};
///
/// let signer = Arc::new(KeyedHashSigner::derive("docs", b"secret"));
/// let request = RequestAdapter::new("req-1".to_string()).extract_context();
/// let mut jar = CookieJar::from_request(&request, CookieJarConfig { validation: true }, signer);
///
/// jar.set(Cookie::new("theme", "dark"));
/// assert_eq!(jar.value("theme"), Some("dark"));
///
/// // The transport value is signed
/// let headers = jar.set_cookie_headers();
/// assert_eq!(headers.len(), 1);
/// assert!(headers[0].starts_with("theme="));
/// assert!(!headers[0].starts_with("theme=dark"));
/// ```
pub struct CookieJar {
    request_id: String,
    entries: BTreeMap<String, Cookie>,
    outbound: BTreeMap<String, cookie::Cookie<'static>>,
    validation: bool,
    signer: Arc<dyn Signer>,
}

impl CookieJar {
    /// Reads the inbound cookies of `request`.
    ///
    /// With validation enabled, values that fail verification or are not
    /// UTF-8 after unwrapping are dropped and logged at `debug` level.
    pub fn from_request(
        request: &RequestContext,
        config: CookieJarConfig,
        signer: Arc<dyn Signer>,
    ) -> Self {
        let mut entries = BTreeMap::new();

        for (name, raw) in request.cookies() {
            let value = if config.validation {
                match signer.verify(raw).map(String::from_utf8) {
                    Some(Ok(value)) => value,
                    _ => {
                        tracing::debug!(
                            request_id = %request.request_id(),
                            cookie = %name,
                            "dropping inbound cookie that failed validation"
                        );
                        continue;
                    }
                }
            } else {
                raw.clone()
            };

            entries.insert(name.clone(), Cookie::new(name.clone(), value));
        }

        Self {
            request_id: request.request_id().to_string(),
            entries,
            outbound: BTreeMap::new(),
            validation: config.validation,
            signer,
        }
    }

    /// Returns the cookie called `name`, if it is readable.
    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.entries.get(name)
    }

    /// Shorthand for `get(name).map(Cookie::value)`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(Cookie::value)
    }

    /// Whether a readable cookie called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of readable cookies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no cookie is readable.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the names of all readable cookies.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Stores `cookie` and instructs the client to set it.
    pub fn set(&mut self, cookie: Cookie) {
        let transport_value = if self.validation {
            self.signer.sign(cookie.value.as_bytes())
        } else {
            cookie.value.clone()
        };

        self.outbound
            .insert(cookie.name.clone(), cookie.to_transport(transport_value));
        self.entries.insert(cookie.name.clone(), cookie);
    }

    /// Removes `name` locally and instructs the client to expire it.
    ///
    /// The removal keeps the path and domain of a cookie set earlier in this
    /// request; otherwise it targets `/` on the current host.
    pub fn remove(&mut self, name: &str) {
        let scope = self
            .entries
            .remove(name)
            .unwrap_or_else(|| Cookie::new(name, ""));

        let mut removal = scope.to_transport(String::new());
        removal.make_removal();

        tracing::debug!(request_id = %self.request_id, cookie = %name, "removing cookie");
        self.outbound.insert(name.to_string(), removal);
    }

    /// The signing primitive this jar was built with.
    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    /// Whether transport values are signed.
    pub fn validation_enabled(&self) -> bool {
        self.validation
    }

    /// Renders one `Set-Cookie` value per pending instruction.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.outbound
            .values()
            .map(|cookie| cookie.encoded().to_string())
            .collect()
    }

    /// Appends the pending `Set-Cookie` headers to a response.
    pub fn write_headers(&self, headers: &mut HeaderMap) -> Result<(), Error> {
        for value in self.set_cookie_headers() {
            headers.append(header::SET_COOKIE, HeaderValue::from_str(&value)?);
        }

        Ok(())
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("request_id", &self.request_id)
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .field("pending", &self.outbound.len())
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}
