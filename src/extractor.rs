use crate::classifier::classify;
use crate::header_parser::parse_list_unsubscribe;
use crate::link_scanner::scan_unsubscribe_links;
use crate::message::{MessageRecord, UnsubscribeDirective};
use log::debug;

/// Resolve the single unsubscribe directive for a message.
///
/// The List-Unsubscribe header is consulted first and, when it yields a
/// target, the HTML body is never looked at. Otherwise the first qualifying
/// link in the HTML body is used.
pub fn extract_directive(message: &MessageRecord) -> Option<UnsubscribeDirective> {
    if let Some(header) = non_empty(&message.list_unsubscribe) {
        if let Some(target) = parse_list_unsubscribe(header) {
            debug!(
                "Found unsubscribe target in List-Unsubscribe header for {}: {}",
                message.id, target
            );
            let method = classify(&target);
            return Some(UnsubscribeDirective::for_message(message, target, method));
        }
    }

    if let Some(html) = non_empty(&message.html_body) {
        if let Some(target) = scan_unsubscribe_links(html).into_iter().next() {
            debug!(
                "Found unsubscribe target in HTML body for {}: {}",
                message.id, target
            );
            let method = classify(&target);
            return Some(UnsubscribeDirective::for_message(message, target, method));
        }
    }

    debug!("No unsubscribe info found for message {}", message.id);
    None
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
