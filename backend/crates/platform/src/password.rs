//! Password Hashing and Verification
//!
//! One-way salted hashing for stored credentials:
//! - Fresh random salt per call (same password never hashes the same twice)
//! - Argon2id key derivation (memory-hard, recommended by OWASP)
//! - Textual `saltHex:hashHex` records
//! - Zeroization of intermediate secrets
//! - Constant-time comparison on verification
//!
//! ## Security Features
//! - Unicode NFKC normalization so visually identical input verifies
//! - Optional application-wide pepper held outside the record store

use std::fmt;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use crate::crypto::{constant_time_eq, random_bytes};

// ============================================================================
// Constants
// ============================================================================

/// Salt length in bytes (128 bits)
pub const SALT_LEN: usize = 16;

/// Derived hash length in bytes
pub const HASH_LEN: usize = 32;

/// Argon2 rejects salts shorter than this
const MIN_SALT_LEN: usize = 8;

/// Bounds accepted when parsing stored records
const MIN_HASH_LEN: usize = 16;
const MAX_HASH_LEN: usize = 64;

// ============================================================================
// Error Types
// ============================================================================

/// Password hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    /// Hashing operation failed
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// Invalid record format
    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Password Record (Safe to store)
// ============================================================================

/// Stored password hash in `saltHex:hashHex` form
///
/// ## Examples
/// ```rust
/// use platform::password::PasswordRecord;
///
/// let record: PasswordRecord =
///     "00112233445566778899aabbccddeeff:00112233445566778899aabbccddeeff".parse().unwrap();
/// assert_eq!(record.salt().len(), 16);
/// assert!("not-a-record".parse::<PasswordRecord>().is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordRecord {
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl PasswordRecord {
    /// Parse a stored `saltHex:hashHex` string
    pub fn parse(record: &str) -> Result<Self, PasswordHashError> {
        let (salt_hex, hash_hex) = record
            .split_once(':')
            .ok_or(PasswordHashError::InvalidHashFormat)?;

        let salt = hex::decode(salt_hex).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        let hash = hex::decode(hash_hex).map_err(|_| PasswordHashError::InvalidHashFormat)?;

        if salt.len() < MIN_SALT_LEN || !(MIN_HASH_LEN..=MAX_HASH_LEN).contains(&hash.len()) {
            return Err(PasswordHashError::InvalidHashFormat);
        }

        Ok(Self { salt, hash })
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }
}

impl fmt::Display for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(&self.salt), hex::encode(&self.hash))
    }
}

impl FromStr for PasswordRecord {
    type Err = PasswordHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRecord")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Password Manager
// ============================================================================

/// Salted password hasher
///
/// ## Examples
/// ```rust
/// use platform::password::PasswordManager;
///
/// let manager = PasswordManager::new();
/// let record = manager.hash_password("correct horse").unwrap();
/// assert!(manager.verify_password("correct horse", &record.to_string()));
/// assert!(!manager.verify_password("wrong horse", &record.to_string()));
/// ```
#[derive(Clone)]
pub struct PasswordManager {
    params: Params,
    pepper: Option<Zeroizing<Vec<u8>>>,
}

impl Default for PasswordManager {
    fn default() -> Self {
        // OWASP recommended Argon2id parameters:
        // m=19456 (19 MiB), t=2, p=1
        Self::with_params(Params::default())
    }
}

impl PasswordManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom Argon2 cost parameters
    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            pepper: None,
        }
    }

    /// Use custom Argon2 costs (memory in KiB, iterations, lanes)
    pub fn with_cost(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordHashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;
        Ok(Self::with_params(params))
    }

    /// Append an application-wide secret to every password before hashing
    ///
    /// The same pepper must be configured when verifying.
    pub fn with_pepper(mut self, pepper: impl Into<Vec<u8>>) -> Self {
        self.pepper = Some(Zeroizing::new(pepper.into()));
        self
    }

    /// Hash a password with a fresh random salt
    ///
    /// Fails only if the configured Argon2 parameters are unusable.
    pub fn hash_password(&self, password: &str) -> Result<PasswordRecord, PasswordHashError> {
        let salt = random_bytes(SALT_LEN);
        let hash = self.derive(password, &salt, HASH_LEN)?;

        Ok(PasswordRecord {
            salt,
            hash: hash.to_vec(),
        })
    }

    /// Verify a password against a stored `salt:hash` record
    ///
    /// Malformed records verify as `false`.
    pub fn verify_password(&self, password: &str, record: &str) -> bool {
        match PasswordRecord::parse(record) {
            Ok(record) => self.verify_record(password, &record),
            Err(_) => false,
        }
    }

    /// Verify a password against an already parsed record
    pub fn verify_record(&self, password: &str, record: &PasswordRecord) -> bool {
        match self.derive(password, &record.salt, record.hash.len()) {
            Ok(candidate) => constant_time_eq(&candidate, &record.hash),
            Err(_) => false,
        }
    }

    fn derive(
        &self,
        password: &str,
        salt: &[u8],
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>, PasswordHashError> {
        let normalized: Zeroizing<String> = Zeroizing::new(password.nfkc().collect());

        let mut material = Zeroizing::new(normalized.as_bytes().to_vec());
        if let Some(pepper) = &self.pepper {
            material.extend_from_slice(pepper);
        }

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let mut output = Zeroizing::new(vec![0u8; output_len]);
        argon2
            .hash_password_into(&material, salt, &mut output)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(output)
    }
}

impl fmt::Debug for PasswordManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordManager")
            .field("params", &self.params)
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so debug-build tests stay fast
    fn fast_manager() -> PasswordManager {
        PasswordManager::with_cost(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_is_salted() {
        let manager = fast_manager();
        let first = manager.hash_password("secret").unwrap();
        let second = manager.hash_password("secret").unwrap();

        assert_ne!(first.to_string(), second.to_string());
        assert!(manager.verify_password("secret", &first.to_string()));
        assert!(manager.verify_password("secret", &second.to_string()));
        assert!(!manager.verify_password("wrong", &first.to_string()));
    }

    #[test]
    fn test_record_format() {
        let record = fast_manager().hash_password("secret").unwrap().to_string();
        let (salt, hash) = record.split_once(':').unwrap();

        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(hash.len(), HASH_LEN * 2);
        assert!(record.chars().all(|c| c == ':' || c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_default_parameters_verify() {
        let manager = PasswordManager::new();
        let record = manager.hash_password("TestPassword123!").unwrap();
        assert!(manager.verify_record("TestPassword123!", &record));
    }

    #[test]
    fn test_malformed_records_fail_closed() {
        let manager = fast_manager();
        assert!(!manager.verify_password("secret", ""));
        assert!(!manager.verify_password("secret", "no-delimiter"));
        assert!(!manager.verify_password("secret", "zz:zz"));
        assert!(!manager.verify_password("secret", "00:00112233445566778899aabbccddeeff"));
        assert!(!manager.verify_password("secret", "00112233445566778899aabbccddeeff:00"));
        assert!(!manager.verify_password("secret", ":"));
    }

    #[test]
    fn test_hash_with_pepper() {
        let peppered = fast_manager().with_pepper(b"my_secret_pepper".to_vec());
        let record = peppered.hash_password("TestPassword123!").unwrap().to_string();

        assert!(peppered.verify_password("TestPassword123!", &record));

        // Correct password without pepper should fail
        assert!(!fast_manager().verify_password("TestPassword123!", &record));

        // Correct password with wrong pepper should fail
        let wrong = fast_manager().with_pepper(b"wrong_pepper".to_vec());
        assert!(!wrong.verify_password("TestPassword123!", &record));
    }

    #[test]
    fn test_invalid_cost_rejected() {
        assert!(matches!(
            PasswordManager::with_cost(1, 0, 0),
            Err(PasswordHashError::HashingFailed(_))
        ));
    }

    #[test]
    fn test_unicode_normalization() {
        let manager = fast_manager();
        // "ｐａｓｓ" (fullwidth) normalizes to "pass" under NFKC
        let record = manager.hash_password("ｐａｓｓ").unwrap().to_string();
        assert!(manager.verify_password("pass", &record));
    }

    #[test]
    fn test_record_roundtrip_through_string() {
        let record = fast_manager().hash_password("secret").unwrap();
        let parsed: PasswordRecord = record.to_string().parse().unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_debug_redaction() {
        let record = fast_manager().hash_password("secret").unwrap();
        let debug_output = format!("{:?}", record);
        assert!(debug_output.contains("[HASH]"));
        assert!(!debug_output.contains(&hex::encode(record.hash())));

        let manager = fast_manager().with_pepper(b"pepper".to_vec());
        assert!(format!("{:?}", manager).contains("REDACTED"));
    }
}
