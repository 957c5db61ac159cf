use http::StatusCode;
use thiserror::Error;

/// Errors that can occur in the request-guard crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A request-level failure that should be turned into an HTTP response
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The configuration document could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A header value contained bytes that are not allowed in HTTP headers
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// A redirect was requested with a status code outside of the 3xx range
    #[error("status {0} is not a redirect status")]
    InvalidRedirectStatus(u16),

    /// The response could not be assembled
    #[error("failed to build response: {0}")]
    Response(#[from] http::Error),
}

/// An error that maps directly onto an HTTP status code.
///
/// This is the only failure a request handler is expected to observe from
/// this crate. Middleware usually renders it as the response body.
///
/// # Examples
///
/// ```
/// use request_guard::HttpError;
/// use http::StatusCode;
///
/// let error = HttpError::bad_request("CSRF token could not be verified");
/// assert_eq!(error.status(), StatusCode::BAD_REQUEST);
/// assert_eq!(error.to_string(), "400 Bad Request: CSRF token could not be verified");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    /// Creates a new HTTP error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for a `400 Bad Request`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
