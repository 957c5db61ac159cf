//! Extraction boundary trait for web integration.

use http::Request;

use crate::request::RequestContext;

use super::RequestAdapter;

/// Builds a [`RequestContext`] from a framework-specific request.
///
/// This trait is the boundary between a web framework's request type and the
/// components of this crate. Implementations only copy data; they never
/// validate CSRF tokens or touch cookies' integrity (that is the job of
/// [`protect`](super::protect)).
///
/// # Examples
///
/// ```
/// use request_guard::web::{ExtractContext, RequestAdapter};
/// use request_guard::RequestContext;
///
/// struct MyFrameworkRequest {
///     id: String,
///     accept: String,
/// }
///
/// impl ExtractContext for MyFrameworkRequest {
///     fn extract_context(&self) -> RequestContext {
///         let mut adapter = RequestAdapter::new(self.id.clone());
///         adapter.add_header("Accept", &self.accept);
///         adapter.extract_context()
///     }
/// }
///
/// let request = MyFrameworkRequest { id: "req-1".into(), accept: "text/html".into() };
/// assert_eq!(request.extract_context().header("accept"), Some("text/html"));
/// ```
pub trait ExtractContext {
    /// Copies the request into an immutable context.
    fn extract_context(&self) -> RequestContext;
}

impl<B> ExtractContext for Request<B>
where
    B: AsRef<[u8]>,
{
    fn extract_context(&self) -> RequestContext {
        RequestAdapter::from_http(self).extract_context()
    }
}
