use crate::message::MessageRecord;
use anyhow::Result;
use async_trait::async_trait;

/// System label id that keeps a message in the primary inbox view.
pub const INBOX_LABEL_ID: &str = "INBOX";

/// Remote mailbox the unsubscriber reads from and relabels.
///
/// All calls are fallible remote operations; errors are returned to the
/// caller untouched.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MessageRecord>>;

    /// Look up a label id by name, matching the name case-insensitively.
    async fn find_label_id(&self, name: &str) -> Result<Option<String>>;

    async fn create_label(&self, name: &str) -> Result<String>;

    async fn modify_labels(
        &self,
        message_id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<()>;
}

/// Outbound mail used by the mailto strategy
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}
