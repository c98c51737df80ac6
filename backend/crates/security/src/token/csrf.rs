//! Anti-forgery tokens

use kernel::clock::duration_ms;
use platform::crypto::random_hex;

use super::TokenManager;
use crate::error::TokenRejection;

const NONCE_BYTES: usize = 16;
const DELIMITER: char = ':';
const SIGNATURE_HEX_LEN: usize = 64;

impl TokenManager {
    /// Issue a token bound to `user_id` and `session_id`
    ///
    /// Neither identifier may contain `:`; such tokens never validate.
    pub fn generate_csrf_token(&self, user_id: &str, session_id: &str) -> String {
        let issued_at_ms = self.clock.now_ms();
        let nonce = random_hex(NONCE_BYTES);
        let body = format!("{user_id}{DELIMITER}{session_id}{DELIMITER}{issued_at_ms}{DELIMITER}{nonce}");
        let signature = hex::encode(self.key.sign(body.as_bytes()));

        format!("{body}{DELIMITER}{signature}")
    }

    /// `true` only for an unexpired, untampered token issued to this identity
    pub fn validate_csrf_token(&self, token: &str, user_id: &str, session_id: &str) -> bool {
        match self.verify_csrf_token(token, user_id, session_id) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!(reason = reason.as_str(), "CSRF token rejected");
                false
            }
        }
    }

    /// Check a token, reporting why it was refused
    pub fn verify_csrf_token(
        &self,
        token: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), TokenRejection> {
        let fields: Vec<&str> = token.split(DELIMITER).collect();
        let &[token_user, token_session, issued_at, _nonce, signature_hex] = fields.as_slice() else {
            return Err(TokenRejection::Malformed);
        };

        let issued_at_ms: i64 = issued_at.parse().map_err(|_| TokenRejection::Malformed)?;
        let age_ms = self.clock.now_ms().saturating_sub(issued_at_ms);
        if age_ms >= duration_ms(self.csrf_ttl) {
            return Err(TokenRejection::Expired);
        }

        if token_user != user_id || token_session != session_id {
            return Err(TokenRejection::IdentityMismatch);
        }

        let signature = decode_signature(signature_hex).ok_or(TokenRejection::Malformed)?;
        let body = &token[..token.len() - signature_hex.len() - 1];
        if !self.key.verify(body.as_bytes(), &signature) {
            return Err(TokenRejection::SignatureMismatch);
        }

        Ok(())
    }
}

/// Strict lowercase hex so every character of the signature is significant
fn decode_signature(signature_hex: &str) -> Option<Vec<u8>> {
    let canonical = signature_hex.len() == SIGNATURE_HEX_LEN
        && signature_hex
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !canonical {
        return None;
    }
    hex::decode(signature_hex).ok()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{CSRF_TTL, manager};
    use super::*;
    use kernel::clock::Clock;
    use std::time::Duration;

    const USER: &str = "user-42";
    const SESSION: &str = "5f2b9c0e";

    #[test]
    fn test_token_format() {
        let (manager, clock) = manager();
        let token = manager.generate_csrf_token(USER, SESSION);
        let fields: Vec<&str> = token.split(':').collect();

        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], USER);
        assert_eq!(fields[1], SESSION);
        assert_eq!(fields[2], clock.now_ms().to_string());
        assert_eq!(fields[3].len(), NONCE_BYTES * 2);
        assert_eq!(fields[4].len(), SIGNATURE_HEX_LEN);
    }

    #[test]
    fn test_round_trip() {
        let (manager, _) = manager();
        for (user, session) in [("u", "s"), ("42", "abc"), ("client@agency", "0f0f")] {
            let token = manager.generate_csrf_token(user, session);
            assert!(manager.validate_csrf_token(&token, user, session));
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let (manager, _) = manager();
        assert_ne!(
            manager.generate_csrf_token(USER, SESSION),
            manager.generate_csrf_token(USER, SESSION)
        );
    }

    #[test]
    fn test_signature_tamper_detected() {
        let (manager, _) = manager();
        let token = manager.generate_csrf_token(USER, SESSION);
        let signature_start = token.rfind(':').unwrap() + 1;

        for i in signature_start..token.len() {
            for replacement in ['0', 'f', 'A', 'z'] {
                let mut bytes = token.clone().into_bytes();
                if bytes[i] == replacement as u8 {
                    continue;
                }
                bytes[i] = replacement as u8;
                let tampered = String::from_utf8(bytes).unwrap();
                assert!(
                    !manager.validate_csrf_token(&tampered, USER, SESSION),
                    "tampered at {} with {}",
                    i,
                    replacement
                );
            }
        }
    }

    #[test]
    fn test_nonce_tamper_detected() {
        let (manager, _) = manager();
        let token = manager.generate_csrf_token(USER, SESSION);
        let mut fields: Vec<String> = token.split(':').map(str::to_string).collect();

        fields[3] = "0".repeat(32);
        assert_eq!(
            manager.verify_csrf_token(&fields.join(":"), USER, SESSION),
            Err(TokenRejection::SignatureMismatch)
        );
    }

    #[test]
    fn test_expiry() {
        let (manager, clock) = manager();
        let token = manager.generate_csrf_token(USER, SESSION);

        clock.advance(CSRF_TTL - Duration::from_millis(1));
        assert!(manager.validate_csrf_token(&token, USER, SESSION));

        clock.advance_ms(1);
        assert_eq!(
            manager.verify_csrf_token(&token, USER, SESSION),
            Err(TokenRejection::Expired)
        );

        clock.advance_ms(1);
        assert!(!manager.validate_csrf_token(&token, USER, SESSION));
    }

    #[test]
    fn test_identity_binding() {
        let (manager, _) = manager();
        let token = manager.generate_csrf_token(USER, SESSION);

        assert_eq!(
            manager.verify_csrf_token(&token, "someone-else", SESSION),
            Err(TokenRejection::IdentityMismatch)
        );
        assert_eq!(
            manager.verify_csrf_token(&token, USER, "other-session"),
            Err(TokenRejection::IdentityMismatch)
        );
    }

    #[test]
    fn test_forged_identity_fails_signature() {
        let (manager, _) = manager();
        let token = manager.generate_csrf_token(USER, SESSION);
        let forged = token.replacen(USER, "admin-1", 1);

        assert_eq!(
            manager.verify_csrf_token(&forged, "admin-1", SESSION),
            Err(TokenRejection::SignatureMismatch)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let (manager, _) = manager();
        for token in ["", "a:b:c:d", "a:b:c:d:e:f", "u:s:not-a-number:n:sig", ":::: "] {
            assert_eq!(
                manager.verify_csrf_token(token, "u", "s"),
                Err(TokenRejection::Malformed),
                "{:?}",
                token
            );
        }
    }

    #[test]
    fn test_other_key_rejected() {
        let (manager, _) = manager();
        let token = manager.generate_csrf_token(USER, SESSION);

        let other = TokenManager::new(
            platform::crypto::HmacKey::new(b"a-completely-different-secret-key").unwrap(),
            manager.csrf_ttl(),
            manager.jwt_ttl(),
            manager.clock.clone(),
        );
        assert!(!other.validate_csrf_token(&token, USER, SESSION));
    }
}
