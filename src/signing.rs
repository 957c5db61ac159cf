//! Tamper-evident envelopes for cookie values and CSRF tokens.
//!
//! The [`Signer`] trait is the single seam between this crate and whatever
//! integrity primitive the application wants to use. [`KeyedHashSigner`] is
//! the default: a `blake3` keyed hash rendered as lowercase hex, prepended
//! to the payload.
//!
//! ```text
//! <64 hex chars of blake3::keyed_hash(key, payload)>.<payload>
//! ```

use std::fmt;

use hex_simd::{AsOut, AsciiCase};

use crate::Secret;

/// Produces and checks signed envelopes.
///
/// Implementations must be safe to share between request workers: the key
/// is read-only after startup.
pub trait Signer: Send + Sync {
    /// Wraps `data` in an envelope that proves it was produced by this signer.
    fn sign(&self, data: &[u8]) -> String;

    /// Unwraps an envelope, returning the original payload.
    ///
    /// Returns `None` for anything that was not produced by [`sign`](Self::sign)
    /// with the same key. Must never panic on attacker-controlled input.
    fn verify(&self, envelope: &str) -> Option<Vec<u8>>;
}

/// `blake3` keyed-hash signer.
///
/// # Examples
///
/// ```
/// use request_guard::{KeyedHashSigner, Signer};
///
/// let signer = KeyedHashSigner::derive("my-app cookies", b"server secret");
/// let envelope = signer.sign(b"hello");
///
/// assert_eq!(signer.verify(&envelope).as_deref(), Some(&b"hello"[..]));
/// assert!(signer.verify("00.hello").is_none());
/// ```
pub struct KeyedHashSigner {
    key: Secret<[u8; blake3::KEY_LEN]>,
}

impl KeyedHashSigner {
    /// Creates a signer from a raw 32-byte key.
    pub fn new(key: [u8; blake3::KEY_LEN]) -> Self {
        Self {
            key: Secret::new(key),
        }
    }

    /// Derives the key from an application secret.
    ///
    /// `context` should be a hardcoded, globally unique string describing
    /// what the key is used for.
    pub fn derive(context: &str, secret: &[u8]) -> Self {
        Self::new(blake3::derive_key(context, secret))
    }
}

impl fmt::Debug for KeyedHashSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedHashSigner")
            .field("key", &self.key)
            .finish()
    }
}

impl Signer for KeyedHashSigner {
    fn sign(&self, data: &[u8]) -> String {
        // Envelopes travel in headers, so the payload is carried as text.
        let payload = String::from_utf8_lossy(data);
        let hash = blake3::keyed_hash(self.key.expose_secret(), payload.as_bytes());
        let hash = hex_simd::encode_to_string(hash.as_bytes(), AsciiCase::Lower);

        format!("{hash}.{payload}")
    }

    fn verify(&self, envelope: &str) -> Option<Vec<u8>> {
        let (hash, message) = envelope.split_once('.')?;
        if hash.len() / 2 != blake3::OUT_LEN || hash.len() % 2 != 0 {
            return None;
        }

        let mut decoded_hash = [0_u8; blake3::OUT_LEN];
        hex_simd::decode(hash.as_bytes(), decoded_hash.as_mut().as_out()).ok()?;

        let expected_hash = blake3::keyed_hash(self.key.expose_secret(), message.as_bytes());

        // `blake3::Hash` compares in constant time
        (expected_hash == decoded_hash).then(|| message.as_bytes().to_vec())
    }
}
