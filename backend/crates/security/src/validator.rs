//! Input Validation and Sanitization
//!
//! Defense-in-depth string filtering plus field-level rules for emails,
//! passwords, and file uploads. This is not an HTML sanitizer: it strips a
//! handful of well-known injection fragments and nothing more.
//!
//! Rule checks accumulate one message per violated rule instead of stopping
//! at the first failure.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum email length (per RFC 5321)
pub const EMAIL_MAX_LENGTH: usize = 254;

/// Default upload ceiling (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

static ANGLE_BRACKETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>]").unwrap());

static JAVASCRIPT_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").unwrap());

static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").unwrap());

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

// ============================================================================
// Sanitization
// ============================================================================

/// Strip angle brackets, `javascript:` schemes, and `on<event>=` attributes
///
/// Stripping repeats until the output is stable so fragments split around a
/// removed token cannot reassemble (e.g. `javajavascript:script:`).
///
/// ## Examples
/// ```rust
/// use security::validator::sanitize_string;
///
/// assert_eq!(sanitize_string("  <b>hi</b>  "), "bhi/b");
/// assert!(!sanitize_string("JavaScript:alert(1)").to_lowercase().contains("javascript:"));
/// ```
pub fn sanitize_string(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let stripped = ANGLE_BRACKETS.replace_all(&current, "");
        let stripped = JAVASCRIPT_SCHEME.replace_all(&stripped, "");
        let stripped = EVENT_HANDLER.replace_all(&stripped, "").into_owned();

        if stripped == current {
            break;
        }
        current = stripped;
    }
    current.trim().to_string()
}

/// Recursively sanitize every string inside a JSON value
///
/// Arrays and object values are walked; object keys, numbers, booleans and
/// nulls are left untouched.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_string(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), sanitize_value(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// `local@domain.tld` shape check, at most [`EMAIL_MAX_LENGTH`] characters
pub fn validate_email(email: &str) -> bool {
    email.chars().count() <= EMAIL_MAX_LENGTH && EMAIL_REGEX.is_match(email)
}

// ============================================================================
// Validation Report
// ============================================================================

/// Outcome of a rule check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

// ============================================================================
// Policies
// ============================================================================

/// Password acceptance rules
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Minimum length in characters
    pub min_length: usize,
    /// Maximum length in characters
    pub max_length: Option<usize>,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    /// Require at least one ASCII punctuation character
    pub require_special: bool,
    /// Reject sequential digits, keyboard runs, and well-known passwords
    pub reject_common_patterns: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: Some(128),
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
            reject_common_patterns: false,
        }
    }
}

/// Upload acceptance rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Maximum size in bytes
    pub max_file_size: u64,
    /// Lowercase extensions without the dot
    pub allowed_extensions: Vec<String>,
    /// Lowercase extensions without the dot
    pub forbidden_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        let to_vec = |exts: &[&str]| exts.iter().map(|e| e.to_string()).collect();
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: to_vec(&[
                "jpg", "jpeg", "png", "gif", "webp", "mp4", "mov", "webm", "mp3", "wav", "pdf",
                "doc", "docx", "ppt", "pptx", "xls", "xlsx", "zip", "psd", "ai",
            ]),
            forbidden_extensions: to_vec(&[
                "exe", "bat", "cmd", "com", "sh", "ps1", "php", "js", "jar", "msi", "vbs", "scr",
                "dll", "html", "htm",
            ]),
        }
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Field-level validator configured with password and upload policies
#[derive(Debug, Clone, Default)]
pub struct InputValidator {
    password_policy: PasswordPolicy,
    upload_policy: UploadPolicy,
}

impl InputValidator {
    pub fn new(password_policy: PasswordPolicy, upload_policy: UploadPolicy) -> Self {
        Self {
            password_policy,
            upload_policy,
        }
    }

    pub fn password_policy(&self) -> &PasswordPolicy {
        &self.password_policy
    }

    pub fn upload_policy(&self) -> &UploadPolicy {
        &self.upload_policy
    }

    pub fn sanitize_string(&self, input: &str) -> String {
        sanitize_string(input)
    }

    pub fn sanitize_value(&self, value: &Value) -> Value {
        sanitize_value(value)
    }

    pub fn validate_email(&self, email: &str) -> bool {
        validate_email(email)
    }

    /// Check a password against every configured rule
    pub fn validate_password(&self, password: &str) -> ValidationReport {
        let policy = &self.password_policy;
        let mut errors = Vec::new();
        let length = password.chars().count();

        if length < policy.min_length {
            errors.push(format!(
                "Password must be at least {} characters long",
                policy.min_length
            ));
        }
        if let Some(max) = policy.max_length {
            if length > max {
                errors.push(format!("Password must be at most {} characters long", max));
            }
        }
        if policy.require_uppercase && !password.chars().any(char::is_uppercase) {
            errors.push("Password must contain at least one uppercase letter".to_string());
        }
        if policy.require_lowercase && !password.chars().any(char::is_lowercase) {
            errors.push("Password must contain at least one lowercase letter".to_string());
        }
        if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Password must contain at least one number".to_string());
        }
        if policy.require_special && !password.chars().any(|c| c.is_ascii_punctuation()) {
            errors.push("Password must contain at least one special character".to_string());
        }
        if policy.reject_common_patterns && is_common_pattern(password) {
            errors.push("Password is too common or follows a predictable pattern".to_string());
        }

        ValidationReport::from_errors(errors)
    }

    /// Check an upload's size and extension; all checks run
    pub fn validate_file_upload(&self, filename: &str, size: u64) -> ValidationReport {
        let policy = &self.upload_policy;
        let mut errors = Vec::new();

        if size > policy.max_file_size {
            errors.push(format!(
                "File size exceeds maximum of {} MB",
                policy.max_file_size / (1024 * 1024)
            ));
        }

        let extension = file_extension(filename);

        if !extension.is_empty() && policy.forbidden_extensions.contains(&extension) {
            errors.push(format!("File type .{} is forbidden", extension));
        }
        if !policy.allowed_extensions.contains(&extension) {
            if extension.is_empty() {
                errors.push("File must have an allowed extension".to_string());
            } else {
                errors.push(format!("File type .{} is not allowed", extension));
            }
        }

        ValidationReport::from_errors(errors)
    }
}

/// Lowercased text after the last dot, empty when there is none
fn file_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_lowercase())
        .unwrap_or_default()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Check for common weak patterns
fn is_common_pattern(password: &str) -> bool {
    let lower = password.to_lowercase();

    // All same character (e.g., "aaaaaaaa")
    let mut chars = lower.chars();
    if let Some(first) = chars.next() {
        if lower.chars().count() >= 3 && chars.all(|c| c == first) {
            return true;
        }
    }

    if is_sequential_numbers(&lower) {
        return true;
    }

    const KEYBOARD_PATTERNS: &[&str] = &[
        "qwerty", "asdfgh", "zxcvbn", "qazwsx", "1qaz2wsx",
    ];
    if KEYBOARD_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return true;
    }

    const COMMON_PASSWORDS: &[&str] = &[
        "password", "password1", "password123", "password123!", "letmein", "welcome",
        "welcome1", "admin123", "iloveyou", "sunshine", "princess", "football", "monkey",
        "dragon", "baseball", "trustno1", "abcdefgh",
    ];
    COMMON_PASSWORDS.contains(&lower.as_str())
}

/// At least four digits, all ascending or all descending by one
fn is_sequential_numbers(s: &str) -> bool {
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < 4 || digits.len() != s.chars().count() {
        return false;
    }

    let is_ascending = digits
        .windows(2)
        .all(|w| w[1] == w[0] + 1 || (w[0] == 9 && w[1] == 0));

    let is_descending = digits
        .windows(2)
        .all(|w| w[0] == w[1] + 1 || (w[0] == 0 && w[1] == 9));

    is_ascending || is_descending
}

// ============================================================================
// Tests
// ============================================================================
