//! Cryptographic Utilities

use std::fmt;

use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate `len` random bytes rendered as lowercase hex (`2 * len` chars)
pub fn random_hex(len: usize) -> String {
    hex::encode(random_bytes(len))
}

/// Encode bytes as unpadded base64url (RFC 4648 §5)
pub fn to_base64url(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url to bytes
pub fn from_base64url(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::URL_SAFE_NO_PAD.decode(s)
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Signing key construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("HMAC key must not be empty")]
    EmptyKey,

    #[error("HMAC key has an invalid length")]
    InvalidKeyLength,
}

/// HMAC-SHA256 signing key
///
/// Keyed once at startup and shared read-only; every `sign`/`verify`
/// call works on a clone of the pre-keyed state.
///
/// ## Examples
/// ```rust
/// use platform::crypto::HmacKey;
///
/// let key = HmacKey::new(b"server-side secret").unwrap();
/// let tag = key.sign(b"payload");
/// assert!(key.verify(b"payload", &tag));
/// assert!(!key.verify(b"tampered", &tag));
/// ```
#[derive(Clone)]
pub struct HmacKey {
    mac: HmacSha256,
}

impl HmacKey {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength)?;
        Ok(Self { mac })
    }

    /// Compute HMAC-SHA256 over `data`
    pub fn sign(&self, data: &[u8]) -> [u8; 32] {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    /// Check a tag in constant time
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.verify_slice(signature).is_ok()
    }
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacKey").field("key", &"[REDACTED]").finish()
    }
}
