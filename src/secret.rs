use std::fmt;

use zeroize::Zeroize;

/// A wrapper that keeps token and key material out of logs.
///
/// CSRF tokens and signing keys pass through structs that derive `Debug`
/// and through `tracing` fields. Wrapping them in `Secret<T>` makes every
/// formatted rendering print `[REDACTED]`, and the value is wiped from memory
/// when the wrapper is dropped.
///
/// # Examples
///
/// ```
/// use request_guard::Secret;
///
/// let token = Secret::new("Vh3kq9".to_string());
///
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert_eq!(format!("{}", token), "[REDACTED]");
/// assert_eq!(token.expose_secret(), "Vh3kq9");
/// ```
// Do NOT derive Clone or Copy: duplicated secrets outlive the zeroize on drop.
pub struct Secret<T: Zeroize> {
    inner: T,
}

impl<T: Zeroize> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the wrapped value.
    ///
    /// The name is deliberately loud so call sites stand out in review.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_redacts_debug() {
        let token = Secret::new("hunter2".to_string());
        let debug_output = format!("{:?}", token);

        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("String"));
    }

    #[test]
    fn secret_redacts_display() {
        let key = Secret::new([7_u8; 32]);
        assert_eq!(format!("{}", key), "[REDACTED]");
    }

    #[test]
    fn secret_redacts_inside_derived_debug() {
        #[derive(Debug)]
        struct Holder {
            token: Secret<String>,
        }

        let holder = Holder {
            token: Secret::new("abc123".to_string()),
        };
        let output = format!("{:?}", holder);
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("abc123"));
    }

    #[test]
    fn secret_exposes_when_explicit() {
        let secret = Secret::new(vec![1_u8, 2, 3]);
        assert_eq!(secret.expose_secret(), &vec![1, 2, 3]);
    }
}
