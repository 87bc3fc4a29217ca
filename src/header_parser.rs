use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HTTP_TARGET: Regex = Regex::new(r"(?i)<(https?://[^>]+)>").unwrap();
    static ref MAILTO_TARGET: Regex = Regex::new(r"(?i)<(mailto:[^>]+)>").unwrap();
}

/// Pick the unsubscribe target out of a List-Unsubscribe header value.
///
/// Format: `<https://...>, <mailto:...>`. Any bracketed HTTP(S) URL wins over a
/// mailto URI regardless of order. Unbracketed or malformed values yield `None`.
pub fn parse_list_unsubscribe(header_value: &str) -> Option<String> {
    if header_value.trim().is_empty() {
        return None;
    }

    if let Some(url) = first_capture(&HTTP_TARGET, header_value) {
        return Some(url);
    }

    first_capture(&MAILTO_TARGET, header_value)
}

fn first_capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|target| !target.is_empty())
}
