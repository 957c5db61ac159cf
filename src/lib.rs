//! Request-scoped cookie, CSRF and content-negotiation layer for HTTP servers.
//!
//! This crate sits between an HTTP server and application handlers and
//! provides:
//! - **Cookie jar**: Reads inbound cookies once, optionally rejecting any
//!   value that was not signed by the server, and turns writes into
//!   `Set-Cookie` headers
//! - **CSRF guard**: Double-submit-cookie protection for state-changing
//!   requests
//! - **Content negotiation**: `Accept` and `Accept-Language` ranking
//!
//! # Core Types
//!
//! - [`RequestContext`]: Immutable copy of one request
//! - [`CookieJar`]: Name → [`Cookie`] mapping with pending `Set-Cookie` instructions
//! - [`CsrfGuard`]: Issues and validates the per-session token
//! - [`AcceptNegotiator`]: Cached preference ranking for one request
//! - [`Signer`]: Tamper-evident envelope primitive, [`KeyedHashSigner`] by default
//! - [`Secret<T>`]: Wrapper that redacts sensitive values in logs/output
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use request_guard::web::{protect, ExtractContext, RequestAdapter};
//! use request_guard::{Config, KeyedHashSigner};
//!
//! let signer = Arc::new(KeyedHashSigner::derive("my app cookies", b"server secret"));
//! let config = Config::from_toml_str("[cookies]\nvalidation = true\n").unwrap();
//!
//! // A GET receives a token
//! let get = RequestAdapter::new("req-1".to_string()).extract_context();
//! let issued = protect(&get, &config, signer.clone()).expect("safe method");
//! let set_cookie = issued.set_cookie_headers().remove(0);
//! let transport = set_cookie.split(';').next().unwrap().split_once('=').unwrap().1;
//!
//! // The follow-up POST echoes it
//! let mut adapter = RequestAdapter::new("req-2".to_string());
//! adapter.set_method(http::Method::POST);
//! adapter.add_cookie("CSRF_TOKEN", transport);
//! adapter.add_body_param("CSRF_TOKEN", issued.token());
//! assert!(protect(&adapter.extract_context(), &config, signer).is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod csrf;
mod error;
mod jar;
mod negotiate;
mod request;
mod response;
mod secret;
mod signing;

pub mod web;

pub use config::{
    Config, CookieAttributes, CookieJarConfig, CsrfConfig, SameSite, DEFAULT_CSRF_TOKEN_NAME,
};
pub use csrf::{CsrfGuard, CSRF_ERROR_MESSAGE, CSRF_HEADER};
pub use error::{Error, HttpError};
pub use jar::{Cookie, CookieJar};
pub use negotiate::{
    canonical_language_id, compare_accept_entries, parse_accept_header, parse_accept_languages,
    rank_accept_languages, rank_accept_types, AcceptEntry, AcceptNegotiator, LanguagePreference,
};
pub use request::{RequestContext, METHOD_OVERRIDE_HEADER, METHOD_OVERRIDE_PARAM};
pub use response::{header_safe, redirect, redirect_found, send_file};
pub use secret::Secret;
pub use signing::{KeyedHashSigner, Signer};
