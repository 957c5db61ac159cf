//! Explicit configuration for the cookie jar and the CSRF guard.
//!
//! Every recognised option is a field. Unknown keys in a TOML document are
//! rejected instead of being silently applied.
//!
//! ```toml
//! [csrf]
//! token-name = "XSRF"
//! legacy-envelope = false
//!
//! [csrf.cookie]
//! secure = true
//! same-site = "strict"
//!
//! [cookies]
//! validation = true
//! ```

use serde::Deserialize;

use crate::error::Error;

/// Default name of the CSRF cookie, body field and header.
pub const DEFAULT_CSRF_TOKEN_NAME: &str = "CSRF_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// CSRF guard section
    #[serde(default)]
    pub csrf: CsrfConfig,
    /// Cookie jar section
    #[serde(default)]
    pub cookies: CookieJarConfig,
}

impl Config {
    /// Parses a TOML document.
    ///
    /// Missing sections and keys fall back to their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use request_guard::Config;
    ///
    /// let config = Config::from_toml_str("[cookies]\nvalidation = true\n").unwrap();
    /// assert!(config.cookies.validation);
    /// assert_eq!(config.csrf.token_name, "CSRF_TOKEN");
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(Error::from)
    }
}

/// CSRF guard options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CsrfConfig {
    /// Cookie name, body field name and header name of the token
    pub token_name: String,
    /// When disabled, `validate` never rejects a request
    pub enabled: bool,
    /// Accept submitted tokens that the client wrapped in a signed envelope
    pub legacy_envelope: bool,
    /// Attributes of the token cookie
    pub cookie: CookieAttributes,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_name: DEFAULT_CSRF_TOKEN_NAME.to_string(),
            enabled: true,
            legacy_envelope: true,
            cookie: CookieAttributes::default(),
        }
    }
}

/// Cookie jar options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CookieJarConfig {
    /// Sign outbound values and drop inbound values whose envelope does not verify
    pub validation: bool,
}

/// Attributes applied to outbound cookies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CookieAttributes {
    /// Lifetime in seconds. `None` makes a session cookie
    pub lifetime_secs: Option<i64>,
    /// Path scope, `/` by default
    pub path: String,
    /// Domain scope, host-only when unset
    pub domain: Option<String>,
    /// Only send over HTTPS
    pub secure: bool,
    /// Hide from client-side scripts
    pub http_only: bool,
    /// Cross-site sending policy
    pub same_site: Option<SameSite>,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            lifetime_secs: None,
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
            same_site: Some(SameSite::Lax),
        }
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}
