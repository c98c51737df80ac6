//! Compact bearer tokens (HS256 JWT)

use platform::crypto::{from_base64url, to_base64url};
use serde_json::{Map, Value};

use super::TokenManager;
use crate::error::TokenRejection;

/// Bearer token claims
pub type Claims = Map<String, Value>;

/// Fixed header, byte-for-byte
pub const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

impl TokenManager {
    /// Sign `claims` with `iat` set to now and `exp = iat + ttl`
    ///
    /// `iat` and `exp` supplied by the caller are overwritten.
    pub fn generate_jwt(&self, claims: &Claims) -> String {
        let iat = self.clock.now_ms().div_euclid(1000);
        let exp = iat.saturating_add(i64::try_from(self.jwt_ttl.as_secs()).unwrap_or(i64::MAX));

        let mut payload = claims.clone();
        payload.insert("iat".to_string(), Value::from(iat));
        payload.insert("exp".to_string(), Value::from(exp));

        let signing_input = format!(
            "{}.{}",
            to_base64url(JWT_HEADER.as_bytes()),
            to_base64url(Value::Object(payload).to_string().as_bytes())
        );
        let signature = to_base64url(&self.key.sign(signing_input.as_bytes()));

        format!("{signing_input}.{signature}")
    }

    /// Decoded claims of a valid, unexpired token
    pub fn validate_jwt(&self, token: &str) -> Option<Claims> {
        match self.verify_jwt(token) {
            Ok(claims) => Some(claims),
            Err(reason) => {
                tracing::debug!(reason = reason.as_str(), "Bearer token rejected");
                None
            }
        }
    }

    /// Check a token, reporting why it was refused
    pub fn verify_jwt(&self, token: &str) -> Result<Claims, TokenRejection> {
        let parts: Vec<&str> = token.split('.').collect();
        let &[header, payload, signature] = parts.as_slice() else {
            return Err(TokenRejection::Malformed);
        };

        let signature = from_base64url(signature).map_err(|_| TokenRejection::Malformed)?;
        let signing_input = &token[..header.len() + 1 + payload.len()];
        if !self.key.verify(signing_input.as_bytes(), &signature) {
            return Err(TokenRejection::SignatureMismatch);
        }

        let payload = from_base64url(payload).map_err(|_| TokenRejection::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenRejection::Malformed)?;

        if let Some(exp) = claims.get("exp") {
            let exp = exp.as_f64().ok_or(TokenRejection::Malformed)?;
            let now_secs = self.clock.now_ms() as f64 / 1000.0;
            if exp < now_secs {
                return Err(TokenRejection::Expired);
            }
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{JWT_TTL, manager};
    use super::*;
    use kernel::clock::Clock;
    use serde_json::json;
    use std::time::Duration;

    fn claims(value: Value) -> Claims {
        match value {
            Value::Object(map) => map,
            _ => panic!("claims must be an object"),
        }
    }

    /// Re-sign an arbitrary payload with the manager's key
    fn sign_raw(manager: &TokenManager, header: &str, payload: &str) -> String {
        let input = format!("{}.{}", to_base64url(header.as_bytes()), to_base64url(payload.as_bytes()));
        let signature = to_base64url(&manager.key.sign(input.as_bytes()));
        format!("{}.{}", input, signature)
    }

    #[test]
    fn test_header_encoding() {
        let (manager, _) = manager();
        let token = manager.generate_jwt(&Claims::new());
        let header = token.split('.').next().unwrap();

        assert_eq!(header, "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
    }

    #[test]
    fn test_round_trip() {
        let (manager, clock) = manager();
        let token = manager.generate_jwt(&claims(json!({"role": "admin", "sub": "u1"})));

        let decoded = manager.validate_jwt(&token).unwrap();
        let iat = decoded["iat"].as_i64().unwrap();

        assert_eq!(decoded["role"], "admin");
        assert_eq!(decoded["sub"], "u1");
        assert_eq!(iat, clock.now_ms() / 1000);
        assert_eq!(decoded["exp"].as_i64().unwrap(), iat + JWT_TTL.as_secs() as i64);
    }

    #[test]
    fn test_reserved_claims_overridden() {
        let (manager, _) = manager();
        let token = manager.generate_jwt(&claims(json!({"iat": 1, "exp": 2})));
        let decoded = manager.validate_jwt(&token).unwrap();
        assert!(decoded["iat"].as_i64().unwrap() > 1);
        assert!(decoded["exp"].as_i64().unwrap() > 2);
    }

    #[test]
    fn test_payload_tamper_detected() {
        let (manager, _) = manager();
        let token = manager.generate_jwt(&claims(json!({"role": "client"})));
        let parts: Vec<&str> = token.split('.').collect();

        let forged_payload = to_base64url(br#"{"role":"admin","iat":0,"exp":99999999999}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(manager.verify_jwt(&forged), Err(TokenRejection::SignatureMismatch));

        let mut flipped = parts[1].to_string().into_bytes();
        flipped[0] = if flipped[0] == b'e' { b'f' } else { b'e' };
        let flipped = format!("{}.{}.{}", parts[0], String::from_utf8(flipped).unwrap(), parts[2]);
        assert!(manager.validate_jwt(&flipped).is_none());
    }

    #[test]
    fn test_signature_tamper_detected() {
        let (manager, _) = manager();
        let token = manager.generate_jwt(&Claims::new());
        let (input, signature) = token.rsplit_once('.').unwrap();

        let other = to_base64url(&[0u8; 32]);
        assert_ne!(signature, other);
        assert!(manager.validate_jwt(&format!("{}.{}", input, other)).is_none());
        assert!(manager.validate_jwt(&format!("{}.", input)).is_none());
    }

    #[test]
    fn test_expiry() {
        let (manager, clock) = manager();
        let token = manager.generate_jwt(&Claims::new());
        let exp = manager.validate_jwt(&token).unwrap()["exp"].as_i64().unwrap();

        clock.set(exp * 1000);
        assert!(manager.validate_jwt(&token).is_some());

        clock.set(exp * 1000 + 1);
        assert_eq!(manager.verify_jwt(&token), Err(TokenRejection::Expired));

        clock.advance(Duration::from_secs(3600));
        assert!(manager.validate_jwt(&token).is_none());
    }

    #[test]
    fn test_malformed_tokens() {
        let (manager, _) = manager();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert_eq!(
                manager.verify_jwt(token),
                Err(TokenRejection::Malformed),
                "{:?}",
                token
            );
        }
    }

    #[test]
    fn test_signed_non_object_payload_rejected() {
        let (manager, _) = manager();
        for payload in ["[1,2,3]", "\"admin\"", "not json"] {
            let token = sign_raw(&manager, JWT_HEADER, payload);
            assert_eq!(manager.verify_jwt(&token), Err(TokenRejection::Malformed));
        }
    }

    #[test]
    fn test_non_numeric_exp_rejected() {
        let (manager, _) = manager();
        let token = sign_raw(&manager, JWT_HEADER, r#"{"exp":"tomorrow"}"#);
        assert_eq!(manager.verify_jwt(&token), Err(TokenRejection::Malformed));
    }

    #[test]
    fn test_token_without_exp_accepted() {
        let (manager, clock) = manager();
        let token = sign_raw(&manager, JWT_HEADER, r#"{"sub":"svc"}"#);
        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert_eq!(manager.validate_jwt(&token).unwrap()["sub"], "svc");
    }
}
