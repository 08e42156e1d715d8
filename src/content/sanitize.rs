//! Sanitizing of CMS-supplied URLs and class names

use url::{ParseError, Url};

/// Schemes allowed in links and image sources
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

/// Return the URL if it is relative or uses an allowed scheme
pub fn safe_url(url: &str) -> Option<&str> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    match Url::parse(url) {
        Ok(parsed) if ALLOWED_SCHEMES.contains(&parsed.scheme()) => Some(url),
        Ok(parsed) => {
            tracing::warn!("Dropping URL with disallowed scheme {:?}", parsed.scheme());
            None
        }
        Err(ParseError::RelativeUrlWithoutBase) => Some(url),
        Err(e) => {
            tracing::warn!("Dropping malformed URL: {}", e);
            None
        }
    }
}

/// Restrict a label to characters that are safe inside a class attribute
pub fn safe_class(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}
