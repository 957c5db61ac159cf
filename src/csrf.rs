//! Double-submit-cookie CSRF protection.
//!
//! The server keeps a random token in a cookie. Every state-changing request
//! must echo that token back in a body field or a header. A cross-site page
//! can make the browser send the cookie but cannot read it, so it cannot
//! produce the matching submitted value.

use std::fmt;

use rand::{distributions::Alphanumeric, Rng};
use subtle::ConstantTimeEq;

use crate::config::CsrfConfig;
use crate::error::HttpError;
use crate::jar::{Cookie, CookieJar};
use crate::request::RequestContext;
use crate::Secret;

/// Conventional header checked after the configured token name.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Message of the `400` returned by [`CsrfGuard::validate`].
pub const CSRF_ERROR_MESSAGE: &str = "CSRF token could not be verified";

const TOKEN_LEN: usize = 40;

/// Why a mutating request was rejected. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    NoSubmittedToken,
    NoCookieToken,
    Mismatch,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSubmittedToken => write!(f, "no token submitted"),
            Self::NoCookieToken => write!(f, "no token cookie"),
            Self::Mismatch => write!(f, "token mismatch"),
        }
    }
}

/// Issues and validates the CSRF token of one request.
///
/// The guard borrows the request and its cookie jar for the duration of the
/// request. The token is looked up (or generated) lazily and cached, so
/// repeated calls to [`token`](Self::token) return the same value.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use request_guard::{CookieJar, CookieJarConfig, CsrfConfig, CsrfGuard, KeyedHashSigner};
/// use request_guard::web::{ExtractContext, RequestAdapter};
///
/// let signer = Arc::new(KeyedHashSigner::derive("docs", b"secret"));
/// let config = CsrfConfig::default();
///
/// // First request: a GET issues the token
/// let get = RequestAdapter::new("req-1".to_string()).extract_context();
/// let mut jar = CookieJar::from_request(&get, CookieJarConfig::default(), signer.clone());
/// let mut guard = CsrfGuard::new(&config, &get, &mut jar);
/// let token = guard.token().to_string();
/// assert!(guard.validate().is_ok());
///
/// // Second request: the form echoes it back
/// let mut adapter = RequestAdapter::new("req-2".to_string());
/// adapter.set_method(http::Method::POST);
/// adapter.add_cookie("CSRF_TOKEN", &token);
/// adapter.add_body_param("CSRF_TOKEN", &token);
/// let post = adapter.extract_context();
///
/// let mut jar = CookieJar::from_request(&post, CookieJarConfig::default(), signer);
/// let guard = CsrfGuard::new(&config, &post, &mut jar);
/// assert!(guard.is_valid());
/// ```
pub struct CsrfGuard<'r> {
    config: &'r CsrfConfig,
    request: &'r RequestContext,
    jar: &'r mut CookieJar,
    token: Option<Secret<String>>,
}

impl<'r> CsrfGuard<'r> {
    /// Creates a guard for one request. Nothing is read until it is used.
    pub fn new(config: &'r CsrfConfig, request: &'r RequestContext, jar: &'r mut CookieJar) -> Self {
        Self {
            config,
            request,
            jar,
            token: None,
        }
    }

    /// Name of the cookie, body field and header carrying the token.
    pub fn token_name(&self) -> &str {
        &self.config.token_name
    }

    /// Returns the token of the current session, issuing one if needed.
    ///
    /// A missing token cookie, or one that is not in the issued format, causes
    /// a new token to be generated from a CSPRNG and stored through the cookie jar.
    pub fn token(&mut self) -> &str {
        let (config, request, jar) = (self.config, self.request, &mut *self.jar);

        self.token
            .get_or_insert_with(|| Secret::new(fetch_or_issue(config, request, jar)))
            .expose_secret()
    }

    /// Checks the submitted token against the token cookie.
    ///
    /// Safe methods always pass. Never fails loudly: the outcome is logged
    /// and returned as a boolean.
    ///
    /// This reports the real outcome even when protection is disabled in
    /// the configuration. Middleware that should honour `enabled` must call
    /// [`validate`](Self::validate) instead.
    pub fn is_valid(&self) -> bool {
        if !self.request.is_mutating() {
            return true;
        }

        match self.check() {
            Ok(()) => true,
            Err(rejection) => {
                tracing::warn!(
                    request_id = %self.request.request_id(),
                    method = %self.request.method(),
                    reason = %rejection,
                    "CSRF validation failed"
                );
                false
            }
        }
    }

    /// Like [`is_valid`](Self::is_valid), but turns a failure into a `400`.
    ///
    /// Always succeeds when protection is disabled in the configuration.
    ///
    /// # Errors
    ///
    /// Returns `HttpError { status: 400 }` with [`CSRF_ERROR_MESSAGE`].
    pub fn validate(&self) -> Result<(), HttpError> {
        if !self.config.enabled || self.is_valid() {
            Ok(())
        } else {
            Err(HttpError::bad_request(CSRF_ERROR_MESSAGE))
        }
    }

    fn submitted_token(&self) -> Option<&str> {
        let name = self.token_name();

        [
            self.request.body_param(name),
            self.request.header(name),
            self.request.header(CSRF_HEADER),
        ]
        .into_iter()
        .flatten()
        .find(|token| !token.is_empty())
    }

    fn check(&self) -> Result<(), Rejection> {
        let submitted = self.submitted_token().ok_or(Rejection::NoSubmittedToken)?;
        let expected = self
            .jar
            .value(self.token_name())
            .filter(|token| !token.is_empty())
            .ok_or(Rejection::NoCookieToken)?;

        if bool::from(expected.as_bytes().ct_eq(submitted.as_bytes())) {
            return Ok(());
        }

        if self.config.legacy_envelope && self.matches_envelope(expected, submitted) {
            tracing::warn!(
                request_id = %self.request.request_id(),
                "CSRF token accepted through legacy signed envelope"
            );
            return Ok(());
        }

        Err(Rejection::Mismatch)
    }

    // Legacy clients submit the token wrapped in a signed envelope.
    fn matches_envelope(&self, expected: &str, submitted: &str) -> bool {
        self.jar
            .signer()
            .verify(submitted)
            .is_some_and(|unwrapped| bool::from(expected.as_bytes().ct_eq(&unwrapped)))
    }
}

impl fmt::Debug for CsrfGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfGuard")
            .field("token_name", &self.config.token_name)
            .field("enabled", &self.config.enabled)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

fn fetch_or_issue(config: &CsrfConfig, request: &RequestContext, jar: &mut CookieJar) -> String {
    if let Some(token) = jar
        .value(&config.token_name)
        .filter(|token| is_token_format(token))
    {
        return token.to_string();
    }

    let token = generate_token();
    jar.set(Cookie::with_attributes(
        config.token_name.clone(),
        token.clone(),
        &config.cookie,
    ));

    tracing::debug!(
        request_id = %request.request_id(),
        token_name = %config.token_name,
        "issued CSRF token"
    );

    token
}

// Only tokens in the issued alphabet are reused.
fn is_token_format(token: &str) -> bool {
    !token.is_empty() && token.len() <= 256 && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(Alphanumeric)
        .map(char::from)
        .take(TOKEN_LEN)
        .collect()
}
