use std::collections::HashMap;
use std::fmt;

/// Flattened view of a mailbox message, populated once by the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub list_unsubscribe: Option<String>,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
}

impl MessageRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// How an unsubscribe target gets acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsubscribeMethod {
    Get,
    Post,
    Mailto,
}

impl fmt::Display for UnsubscribeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnsubscribeMethod::Get => "GET",
            UnsubscribeMethod::Post => "POST",
            UnsubscribeMethod::Mailto => "MAILTO",
        };
        f.write_str(name)
    }
}

/// A resolved unsubscribe action for one message.
///
/// Built by the extractor and consumed once by the dispatcher. `headers` is
/// attached to HTTP requests when present; the extractor never fills it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeDirective {
    pub target: String,
    pub method: UnsubscribeMethod,
    pub headers: Option<HashMap<String, String>>,
    pub message_id: String,
    pub subject: Option<String>,
    pub from: Option<String>,
}

impl UnsubscribeDirective {
    pub fn for_message(message: &MessageRecord, target: String, method: UnsubscribeMethod) -> Self {
        Self {
            target,
            method,
            headers: None,
            message_id: message.id.clone(),
            subject: message.subject.clone(),
            from: message.from.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display_names() {
        assert_eq!(UnsubscribeMethod::Get.to_string(), "GET");
        assert_eq!(UnsubscribeMethod::Post.to_string(), "POST");
        assert_eq!(UnsubscribeMethod::Mailto.to_string(), "MAILTO");
    }

    #[test]
    fn test_directive_copies_reporting_fields() {
        let mut message = MessageRecord::new("msg123");
        message.subject = Some("Weekly deals".to_string());
        message.from = Some("deals@shop.test".to_string());

        let directive = UnsubscribeDirective::for_message(
            &message,
            "https://shop.test/u".to_string(),
            UnsubscribeMethod::Get,
        );

        assert_eq!(directive.message_id, "msg123");
        assert_eq!(directive.subject.as_deref(), Some("Weekly deals"));
        assert_eq!(directive.from.as_deref(), Some("deals@shop.test"));
        assert!(directive.headers.is_none());
    }
}
