use crate::store::{MessageStore, INBOX_LABEL_ID};
use anyhow::Result;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;

/// Where a message ends up after one pass through the unsubscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalState {
    Processed,
    NoDirective,
    ExecutionFailed,
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminalState::Processed => "processed",
            TerminalState::NoDirective => "failed (no unsubscribe info)",
            TerminalState::ExecutionFailed => "failed (execution failed)",
        };
        f.write_str(name)
    }
}

/// Label name to label id lookups made during a single run.
///
/// Owned by the run driver and dropped with it, so nothing carries over
/// between runs.
#[derive(Debug, Default)]
pub struct LabelCache {
    ids: HashMap<String, String>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    fn insert(&mut self, name: &str, id: String) -> String {
        self.ids.entry(name.to_string()).or_insert(id).clone()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Applies the label changes that record a message's terminal state.
pub struct LabelTransitionController<'a> {
    store: &'a dyn MessageStore,
    processed_label: String,
    failed_label: String,
    source_label: Option<String>,
}

impl<'a> LabelTransitionController<'a> {
    pub fn new(
        store: &'a dyn MessageStore,
        processed_label: impl Into<String>,
        failed_label: impl Into<String>,
        source_label: Option<String>,
    ) -> Self {
        Self {
            store,
            processed_label: processed_label.into(),
            failed_label: failed_label.into(),
            source_label: source_label.filter(|label| !label.trim().is_empty()),
        }
    }

    /// Label a message for its terminal state.
    ///
    /// Store faults are returned as-is. A source label that doesn't exist is
    /// skipped with a warning.
    pub async fn transition(
        &self,
        cache: &mut LabelCache,
        message_id: &str,
        state: TerminalState,
    ) -> Result<()> {
        debug!("Transitioning message {} to {}", message_id, state);

        match state {
            TerminalState::Processed => {
                self.apply_label(cache, message_id, &self.processed_label)
                    .await?;
                self.archive(message_id).await?;
            }
            TerminalState::NoDirective | TerminalState::ExecutionFailed => {
                self.apply_label(cache, message_id, &self.failed_label)
                    .await?;
            }
        }

        if let Some(source_label) = &self.source_label {
            self.remove_label(cache, message_id, source_label).await?;
        }

        Ok(())
    }

    pub async fn apply_label(
        &self,
        cache: &mut LabelCache,
        message_id: &str,
        label_name: &str,
    ) -> Result<()> {
        let label_id = self.get_or_create_label_id(cache, label_name).await?;
        self.store.modify_labels(message_id, &[label_id], &[]).await?;
        info!("Applied label '{}' to message {}", label_name, message_id);
        Ok(())
    }

    pub async fn remove_label(
        &self,
        cache: &mut LabelCache,
        message_id: &str,
        label_name: &str,
    ) -> Result<()> {
        let label_id = match self.lookup_label_id(cache, label_name).await? {
            Some(id) => id,
            None => {
                warn!("Label '{}' not found, cannot remove", label_name);
                return Ok(());
            }
        };

        self.store.modify_labels(message_id, &[], &[label_id]).await?;
        info!("Removed label '{}' from message {}", label_name, message_id);
        Ok(())
    }

    pub async fn archive(&self, message_id: &str) -> Result<()> {
        self.store
            .modify_labels(message_id, &[], &[INBOX_LABEL_ID.to_string()])
            .await?;
        info!("Removed message {} from inbox", message_id);
        Ok(())
    }

    async fn lookup_label_id(
        &self,
        cache: &mut LabelCache,
        label_name: &str,
    ) -> Result<Option<String>> {
        if let Some(id) = cache.get(label_name) {
            return Ok(Some(id.to_string()));
        }

        Ok(self
            .store
            .find_label_id(label_name)
            .await?
            .map(|id| cache.insert(label_name, id)))
    }

    async fn get_or_create_label_id(
        &self,
        cache: &mut LabelCache,
        label_name: &str,
    ) -> Result<String> {
        if let Some(id) = self.lookup_label_id(cache, label_name).await? {
            return Ok(id);
        }

        let id = self.store.create_label(label_name).await?;
        info!("Created label '{}'", label_name);
        Ok(cache.insert(label_name, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryStore, Modification};
    use std::sync::atomic::Ordering;

    fn modification(message_id: &str, add: &[&str], remove: &[&str]) -> Modification {
        Modification {
            message_id: message_id.to_string(),
            add: add.iter().map(|s| s.to_string()).collect(),
            remove: remove.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::default()
            .with_label("Label_src", "unsubscribe")
            .with_label("Label_done", "Unsubscribed")
    }

    fn controller<'a>(
        store: &'a MemoryStore,
        source: Option<&str>,
    ) -> LabelTransitionController<'a> {
        LabelTransitionController::new(
            store,
            "Unsubscribed",
            "unsubscribe-failed",
            source.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_processed_with_source_label() {
        let store = store();
        let mut cache = LabelCache::new();

        controller(&store, Some("unsubscribe"))
            .transition(&mut cache, "m1", TerminalState::Processed)
            .await
            .unwrap();

        assert_eq!(
            store.modifications(),
            vec![
                modification("m1", &["Label_done"], &[]),
                modification("m1", &[], &["INBOX"]),
                modification("m1", &[], &["Label_src"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_create_failed_label_and_remove_source() {
        for state in [TerminalState::NoDirective, TerminalState::ExecutionFailed] {
            let store = store();
            let mut cache = LabelCache::new();

            controller(&store, Some("unsubscribe"))
                .transition(&mut cache, "m1", state)
                .await
                .unwrap();

            let failed_id = store.label_id("unsubscribe-failed").unwrap();
            assert_eq!(
                store.modifications(),
                vec![
                    modification("m1", &[failed_id.as_str()], &[]),
                    modification("m1", &[], &["Label_src"]),
                ]
            );
            assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_no_source_label_in_effect() {
        let store = store();
        let mut cache = LabelCache::new();
        let controller = controller(&store, None);

        controller
            .transition(&mut cache, "m1", TerminalState::Processed)
            .await
            .unwrap();
        controller
            .transition(&mut cache, "m2", TerminalState::ExecutionFailed)
            .await
            .unwrap();

        let failed_id = store.label_id("unsubscribe-failed").unwrap();
        assert_eq!(
            store.modifications(),
            vec![
                modification("m1", &["Label_done"], &[]),
                modification("m1", &[], &["INBOX"]),
                modification("m2", &[failed_id.as_str()], &[]),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_source_label_is_ignored() {
        let store = store();
        let mut cache = LabelCache::new();

        controller(&store, Some("  "))
            .transition(&mut cache, "m1", TerminalState::NoDirective)
            .await
            .unwrap();

        assert_eq!(store.modifications().len(), 1);
    }

    #[tokio::test]
    async fn test_label_ids_memoized_within_run() {
        let store = store();
        let mut cache = LabelCache::new();
        let controller = controller(&store, Some("unsubscribe"));

        for id in ["m1", "m2", "m3"] {
            controller
                .transition(&mut cache, id, TerminalState::ExecutionFailed)
                .await
                .unwrap();
        }

        // one lookup for the failed label (then created), one for the source label
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(store.modifications().len(), 6);
    }

    #[tokio::test]
    async fn test_fresh_cache_queries_store_again() {
        let store = store();
        let controller = controller(&store, None);

        let mut first = LabelCache::new();
        controller
            .apply_label(&mut first, "m1", "Unsubscribed")
            .await
            .unwrap();
        let mut second = LabelCache::new();
        controller
            .apply_label(&mut second, "m2", "Unsubscribed")
            .await
            .unwrap();

        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_removing_missing_label_is_noop() {
        let store = MemoryStore::default();
        let mut cache = LabelCache::new();

        controller(&store, None)
            .remove_label(&mut cache, "m1", "does-not-exist")
            .await
            .unwrap();

        assert!(store.modifications().is_empty());
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_store_fault_propagates() {
        let store = store();
        store.fail_modify.store(true, Ordering::SeqCst);
        let mut cache = LabelCache::new();

        let result = controller(&store, Some("unsubscribe"))
            .transition(&mut cache, "m1", TerminalState::Processed)
            .await;

        assert!(result.is_err());
    }
}
