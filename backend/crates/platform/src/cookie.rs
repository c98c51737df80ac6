//! Cookie Management Infrastructure
//!
//! Builders for the cookies that carry the session id and bearer token
//! back to the browser.

use axum::http::{HeaderMap, HeaderValue, header};

/// Default name of the session id cookie
pub const SESSION_COOKIE_NAME: &str = "sid";

/// Default name of the bearer token cookie
pub const BEARER_COOKIE_NAME: &str = "access_token";

/// SameSite policy for cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie configuration
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age_secs: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age_secs: None,
        }
    }
}

impl CookieConfig {
    /// HttpOnly session id cookie living as long as the session
    pub fn session(max_age_secs: i64) -> Self {
        Self {
            max_age_secs: Some(max_age_secs),
            ..Self::default()
        }
    }

    /// HttpOnly bearer token cookie, strict same-site
    pub fn bearer(max_age_secs: i64) -> Self {
        Self {
            name: BEARER_COOKIE_NAME.to_string(),
            same_site: SameSite::Strict,
            max_age_secs: Some(max_age_secs),
            ..Self::default()
        }
    }

    /// Allow plain-HTTP cookies (local development only)
    pub fn insecure(mut self) -> Self {
        self.secure = false;
        self
    }

    /// Build Set-Cookie header value
    pub fn build_set_cookie(&self, value: &str) -> String {
        let mut cookie = format!("{}={}", self.name, value);

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        cookie.push_str(&format!("; Path={}", self.path));

        if let Some(max_age) = self.max_age_secs {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }

        cookie
    }

    /// Build Set-Cookie header for deletion (expired)
    pub fn build_delete_cookie(&self) -> String {
        format!("{}=; HttpOnly; Path={}; Max-Age=0", self.name, self.path)
    }
}

/// Extract a cookie value from headers
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;

            if key == name {
                Some(value.to_string())
            } else {
                None
            }
        })
}

/// Create a Set-Cookie header value
///
/// Returns `None` when the value contains bytes not allowed in a header.
pub fn set_cookie_header(config: &CookieConfig, value: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&config.build_set_cookie(value)).ok()
}

/// Create a Set-Cookie header value that clears the cookie
pub fn delete_cookie_header(config: &CookieConfig) -> Option<HeaderValue> {
    HeaderValue::from_str(&config.build_delete_cookie()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie() {
        let cookie = CookieConfig::session(1800).build_set_cookie("abc123");
        assert!(cookie.starts_with("sid=abc123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=1800"));
    }

    #[test]
    fn test_bearer_cookie_insecure() {
        let cookie = CookieConfig::bearer(60).insecure().build_set_cookie("t.o.k");
        assert!(cookie.starts_with("access_token=t.o.k"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_delete_cookie() {
        let header = delete_cookie_header(&CookieConfig::session(10)).unwrap();
        assert_eq!(header, "sid=; HttpOnly; Path=/; Max-Age=0");
    }

    #[test]
    fn test_set_cookie_header_rejects_control_bytes() {
        assert!(set_cookie_header(&CookieConfig::default(), "bad\nvalue").is_none());
        assert!(set_cookie_header(&CookieConfig::default(), "good").is_some());
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; sid=abc123; other=xyz"),
        );

        assert_eq!(extract_cookie(&headers, "sid"), Some("abc123".to_string()));
        assert_eq!(extract_cookie(&headers, "foo"), Some("bar".to_string()));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }
}
