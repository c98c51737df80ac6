//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (HMAC-SHA256 signing keys, Base64url, hex)
//! - Salted password hashing (Argon2id, `salt:hash` records)
//! - Rate limiting abstractions
//! - Cookie management
//! - Client identification

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod rate_limit;
