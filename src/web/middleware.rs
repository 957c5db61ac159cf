//! Per-request protection pipeline.
//!
//! ```text
//! HTTP Request
//!   ↓
//! RequestAdapter / ExtractContext builds RequestContext
//!   ↓
//! protect(): CookieJar::from_request → CsrfGuard::validate → CsrfGuard::token
//!   ↓
//! Ok(Protected)            Err(HttpError 400)
//!   ↓                        ↓
//! handler renders forms    middleware renders the error
//!   ↓
//! Protected::write_headers adds Set-Cookie to the response
//! ```

use std::fmt;
use std::sync::Arc;

use http::HeaderMap;

use crate::config::Config;
use crate::csrf::CsrfGuard;
use crate::error::{Error, HttpError};
use crate::jar::CookieJar;
use crate::request::RequestContext;
use crate::signing::Signer;
use crate::Secret;

/// Outcome of a request that passed CSRF validation.
///
/// Holds the request's cookie jar (with any pending `Set-Cookie`
/// instructions) and the token handlers should embed in forms.
pub struct Protected {
    jar: CookieJar,
    token_name: String,
    token: Secret<String>,
}

impl Protected {
    /// Name of the form field / header the client must echo the token in.
    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    /// Token value to embed in forms or expose to scripts.
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// The request's cookie jar.
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    /// Mutable access for handlers that set their own cookies.
    pub fn jar_mut(&mut self) -> &mut CookieJar {
        &mut self.jar
    }

    /// Consumes the result, keeping only the cookie jar.
    pub fn into_jar(self) -> CookieJar {
        self.jar
    }

    /// `Set-Cookie` header values to send with the response.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.jar.set_cookie_headers()
    }

    /// Appends the pending `Set-Cookie` headers to a response.
    pub fn write_headers(&self, headers: &mut HeaderMap) -> Result<(), Error> {
        self.jar.write_headers(headers)
    }
}

impl fmt::Debug for Protected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protected")
            .field("jar", &self.jar)
            .field("token_name", &self.token_name)
            .field("token", &self.token)
            .finish()
    }
}

/// Runs cookie decoding and CSRF validation for one request.
///
/// Safe requests always pass and receive a token (issued if the client has
/// none yet). Mutating requests must echo the token from their cookie.
///
/// # Errors
///
/// Returns `HttpError { status: 400 }` when CSRF validation fails and
/// protection is enabled.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use request_guard::{web::protect, Config, KeyedHashSigner};
/// use request_guard::web::{ExtractContext, RequestAdapter};
///
/// let signer = Arc::new(KeyedHashSigner::derive("docs", b"secret"));
/// let config = Config::default();
///
/// let request = RequestAdapter::new("req-1".to_string()).extract_context();
/// let protected = protect(&request, &config, signer.clone()).expect("GET always passes");
/// assert_eq!(protected.token_name(), "CSRF_TOKEN");
/// assert_eq!(protected.set_cookie_headers().len(), 1);
///
/// let mut adapter = RequestAdapter::new("req-2".to_string());
/// adapter.set_method(http::Method::POST);
/// let forged = adapter.extract_context();
/// assert_eq!(protect(&forged, &config, signer).unwrap_err().status(), 400);
/// ```
pub fn protect(
    request: &RequestContext,
    config: &Config,
    signer: Arc<dyn Signer>,
) -> Result<Protected, HttpError> {
    let mut jar = CookieJar::from_request(request, config.cookies.clone(), signer);

    let token = {
        let mut guard = CsrfGuard::new(&config.csrf, request, &mut jar);
        guard.validate()?;
        guard.token().to_string()
    };

    Ok(Protected {
        jar,
        token_name: config.csrf.token_name.clone(),
        token: Secret::new(token),
    })
}
