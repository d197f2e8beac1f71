//! URL acceptance check for incoming text messages.

/// Schemes a submitted link may start with.
const ACCEPTED_PREFIXES: [&str; 2] = ["http://", "https://"];

/// Returns `true` if the text looks like a link the bot can work with.
///
/// Only the prefix is checked; the rest of the string is passed through as-is.
///
/// # Examples
///
/// ```
/// use linkqr_bot::validator::is_supported_url;
///
/// assert!(is_supported_url("https://example.com"));
/// assert!(!is_supported_url("example.com"));
/// ```
#[must_use]
pub fn is_supported_url(text: &str) -> bool {
    ACCEPTED_PREFIXES
        .iter()
        .any(|prefix| text.starts_with(prefix))
}
