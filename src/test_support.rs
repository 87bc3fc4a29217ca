use crate::message::MessageRecord;
use crate::store::{MailSender, MessageStore};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub message_id: String,
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

/// In-memory mailbox that records every call made against it
#[derive(Default)]
pub struct MemoryStore {
    pub messages: Vec<MessageRecord>,
    pub labels: Mutex<Vec<(String, String)>>,
    pub modifications: Mutex<Vec<Modification>>,
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub searches: Mutex<Vec<(String, usize)>>,
    pub lookups: AtomicUsize,
    pub creates: AtomicUsize,
    pub fail_modify: AtomicBool,
}

impl MemoryStore {
    pub fn with_messages(messages: Vec<MessageRecord>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_label(self, id: &str, name: &str) -> Self {
        self.labels
            .lock()
            .unwrap()
            .push((id.to_string(), name.to_string()));
        self
    }

    pub fn modifications(&self) -> Vec<Modification> {
        self.modifications.lock().unwrap().clone()
    }

    pub fn label_id(&self, name: &str) -> Option<String> {
        self.labels
            .lock()
            .unwrap()
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(id, _)| id.clone())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MessageRecord>> {
        self.searches.lock().unwrap().push((query.to_string(), limit));
        Ok(self.messages.iter().take(limit).cloned().collect())
    }

    async fn find_label_id(&self, name: &str) -> Result<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.label_id(name))
    }

    async fn create_label(&self, name: &str) -> Result<String> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut labels = self.labels.lock().unwrap();
        let id = format!("Label_{}", labels.len() + 1);
        labels.push((id.clone(), name.to_string()));
        Ok(id)
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<()> {
        if self.fail_modify.load(Ordering::SeqCst) {
            bail!("mailbox unreachable");
        }
        self.modifications.lock().unwrap().push(Modification {
            message_id: message_id.to_string(),
            add: add_label_ids.to_vec(),
            remove: remove_label_ids.to_vec(),
        });
        Ok(())
    }
}

#[async_trait]
impl MailSender for MemoryStore {
    async fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}
