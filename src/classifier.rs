use crate::message::UnsubscribeMethod;

const MAILTO_PREFIX: &str = "mailto:";

/// Map a resolved target to its execution method.
///
/// Only `mailto:` targets are MAILTO. Everything else is GET; POST is never
/// chosen here and must be requested explicitly on a directive.
pub fn classify(target: &str) -> UnsubscribeMethod {
    if has_mailto_prefix(target) {
        UnsubscribeMethod::Mailto
    } else {
        UnsubscribeMethod::Get
    }
}

pub(crate) fn has_mailto_prefix(target: &str) -> bool {
    target
        .get(..MAILTO_PREFIX.len())
        .map(|prefix| prefix.eq_ignore_ascii_case(MAILTO_PREFIX))
        .unwrap_or(false)
}
