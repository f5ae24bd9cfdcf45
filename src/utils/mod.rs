//! Utility functions and helpers.

pub mod console;
pub mod http;
pub mod slug;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against an optional base URL string.
///
/// Absolute hrefs are returned unchanged; relative hrefs without a parseable
/// base are returned as-is.
pub fn resolve(base_url: Option<&str>, href: &str) -> String {
    match base_url.and_then(|b| Url::parse(b).ok()) {
        Some(base) => resolve_url(&base, href),
        None => href.to_string(),
    }
}

/// Extract the lowercase host from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_lowercase()))
}
