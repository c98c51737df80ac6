//! In-memory account directory
//!
//! Accounts are keyed by normalized (trimmed, lowercased) email and hold only
//! the `salt:hash` password record, never the password.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use platform::crypto::random_hex;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
    Freelancer,
    Expert,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Client => "client",
            Role::Freelancer => "freelancer",
            Role::Expert => "expert",
        }
    }

    /// Roles a visitor may pick at sign-up
    pub fn is_self_service(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "client" => Ok(Role::Client),
            "freelancer" => Ok(Role::Freelancer),
            "expert" => Ok(Role::Expert),
            _ => Err(()),
        }
    }
}

#[derive(Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub password_record: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("password_record", &"[HASH]")
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct AccountDirectory {
    accounts: Mutex<HashMap<String, Account>>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account; fails if the email is taken
    pub fn register(
        &self,
        email: &str,
        display_name: &str,
        role: Role,
        password_record: String,
    ) -> Result<Account, ApiError> {
        let email = normalize_email(email);
        let mut accounts = self.lock();
        if accounts.contains_key(&email) {
            return Err(ApiError::EmailTaken);
        }

        let account = Account {
            id: random_hex(16),
            email: email.clone(),
            display_name: display_name.to_string(),
            role,
            password_record,
        };
        accounts.insert(email, account.clone());
        Ok(account)
    }

    pub fn find_by_email(&self, email: &str) -> Option<Account> {
        self.lock().get(&normalize_email(email)).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_find() {
        let directory = AccountDirectory::new();
        let account = directory
            .register(" Ana@Agency.io ", "Ana", Role::Client, "salt:hash".into())
            .unwrap();

        assert_eq!(account.email, "ana@agency.io");
        assert_eq!(account.id.len(), 32);
        assert_eq!(directory.find_by_email("ANA@agency.io").unwrap().id, account.id);
        assert!(directory.find_by_email("bob@agency.io").is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let directory = AccountDirectory::new();
        directory
            .register("ana@agency.io", "Ana", Role::Client, "a:b".into())
            .unwrap();
        let result = directory.register("ANA@agency.io", "Ana 2", Role::Expert, "c:d".into());

        assert!(matches!(result, Err(ApiError::EmailTaken)));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("expert".parse::<Role>(), Ok(Role::Expert));
        assert!("root".parse::<Role>().is_err());
        assert!(!Role::Admin.is_self_service());
        assert!(Role::Freelancer.is_self_service());
    }
}
