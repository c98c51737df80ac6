//! Client identification utilities
//!
//! Derives the identifiers rate limiting is keyed on from HTTP headers.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For header first (for reverse proxy setups),
/// then falls back to direct connection IP.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `direct_ip` - Direct connection IP address
///
/// ## Returns
/// The client IP address, or None if not determinable
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    // Check X-Forwarded-For header (first IP in the list)
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    direct_ip
}

/// Build the rate-limit identifier for a client hitting a route
///
/// Unknown clients share one bucket per route.
pub fn rate_limit_key(client_ip: Option<IpAddr>, route: &str) -> String {
    match client_ip {
        Some(ip) => format!("{}:{}", ip, route),
        None => format!("unknown:{}", route),
    }
}
