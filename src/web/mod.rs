//! Web framework integration surface.
//!
//! This module is the boundary between an HTTP server and the request-scoped
//! components of this crate. It handles:
//! - Mapping HTTP requests to an immutable [`RequestContext`](crate::RequestContext)
//! - Request-ID extraction and propagation
//! - Running the cookie jar and CSRF guard once per request
//!
//! # Design Principles
//!
//! 1. **No Framework Dependencies**: Only the `http` types are used. Servers
//!    built on other request types fill a [`RequestAdapter`] by hand or
//!    implement [`ExtractContext`].
//!
//! 2. **Copy at the Boundary**: The context owns its data. Nothing downstream
//!    reads the live request again.
//!
//! 3. **Explicit Context**: No global state. The configuration and the signer
//!    are passed to [`protect`] on every call.
//!
//! # Example Flow
//!
//! ```
//! use std::sync::Arc;
//! use http::{header, Request, Response};
//! use request_guard::web::{protect, ExtractContext};
//! use request_guard::{AcceptNegotiator, Config, KeyedHashSigner};
//!
//! let signer = Arc::new(KeyedHashSigner::derive("app cookies", b"server secret"));
//! let config = Config::default();
//!
//! let http_request = Request::builder()
//!     .uri("/form")
//!     .header(header::ACCEPT, "text/html,application/json;q=0.5")
//!     .body(Vec::<u8>::new())
//!     .unwrap();
//!
//! // 1. Copy the request
//! let request = http_request.extract_context();
//!
//! // 2. Cookies and CSRF
//! let protected = protect(&request, &config, signer).expect("GET passes");
//!
//! // 3. Content negotiation
//! let negotiator = AcceptNegotiator::new(&request);
//! assert!(negotiator.preferred_type().is_some_and(|t| t.essence() == "text/html"));
//!
//! // 4. Respond, forwarding the token cookie
//! let mut response = Response::new(Vec::<u8>::new());
//! protected.write_headers(response.headers_mut()).unwrap();
//! assert!(response.headers().contains_key(header::SET_COOKIE));
//! ```

mod adapter;
pub mod example_handler;
mod extract;
mod middleware;

pub use adapter::{RequestAdapter, REQUEST_ID_HEADER};
pub use extract::ExtractContext;
pub use middleware::{protect, Protected};
