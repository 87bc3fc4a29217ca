use crate::config::Config;
use crate::dispatcher::{ExecutionOutcome, UnsubscribeExecutor};
use crate::extractor::extract_directive;
use crate::labels::{LabelCache, LabelTransitionController, TerminalState};
use crate::message::MessageRecord;
use crate::store::MessageStore;
use anyhow::{Context, Result};
use log::info;

/// Per-run settings pulled out of the configuration
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub query: String,
    pub max_messages: usize,
    pub processed_label: String,
    pub failed_label: String,
    pub source_label: Option<String>,
    pub dry_run: bool,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            query: config.active_query().to_string(),
            max_messages: config.max_messages_per_run,
            processed_label: config.processed_label.clone(),
            failed_label: config.failed_label.clone(),
            source_label: config.source_label_in_effect().map(str::to_string),
            dry_run: false,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub failed_no_directive: usize,
    pub failed_execution: usize,
    /// Messages with a directive that were left alone because of a dry run
    pub planned: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.processed + self.failed_no_directive + self.failed_execution + self.planned
    }

    fn record(&mut self, state: TerminalState) {
        match state {
            TerminalState::Processed => self.processed += 1,
            TerminalState::NoDirective => self.failed_no_directive += 1,
            TerminalState::ExecutionFailed => self.failed_execution += 1,
        }
    }
}

/// Process one batch of messages, strictly one after another.
///
/// Execution faults only decide which label a message gets. Store faults
/// abort the run and are returned to the caller.
pub async fn run(
    store: &dyn MessageStore,
    executor: &UnsubscribeExecutor,
    settings: &RunSettings,
) -> Result<RunSummary> {
    info!("Search Query: {}", settings.query);
    info!("Max Messages Per Run: {}", settings.max_messages);

    let messages = store
        .search(&settings.query, settings.max_messages)
        .await
        .context("Message search failed")?;

    let controller = LabelTransitionController::new(
        store,
        settings.processed_label.as_str(),
        settings.failed_label.as_str(),
        settings.source_label.clone(),
    );
    let mut cache = LabelCache::new();
    let mut summary = RunSummary::default();

    for message in &messages {
        print_message_header(message);

        let directive = match extract_directive(message) {
            Some(directive) => directive,
            None => {
                println!("  No unsubscribe info found - marking as failed");
                if !settings.dry_run {
                    controller
                        .transition(&mut cache, &message.id, TerminalState::NoDirective)
                        .await
                        .with_context(|| format!("Labeling message {} failed", message.id))?;
                }
                summary.record(TerminalState::NoDirective);
                println!();
                continue;
            }
        };

        println!("  Unsubscribe URL: {}", directive.target);
        println!("  Method: {}", directive.method);

        if settings.dry_run {
            println!("  Dry run - not executed");
            summary.planned += 1;
            println!();
            continue;
        }

        let outcome = executor.execute(&directive).await;
        let state = match &outcome {
            ExecutionOutcome::Success(detail) => {
                println!("  Result: SUCCESS ({detail})");
                TerminalState::Processed
            }
            ExecutionOutcome::Failure(reason) => {
                println!("  Result: FAILED ({reason})");
                TerminalState::ExecutionFailed
            }
        };

        controller
            .transition(&mut cache, &message.id, state)
            .await
            .with_context(|| format!("Labeling message {} failed", message.id))?;

        match state {
            TerminalState::Processed => {
                println!("  Labeled as '{}' and archived", settings.processed_label)
            }
            _ => println!("  Labeled as '{}'", settings.failed_label),
        }
        summary.record(state);
        println!();
    }

    info!(
        "Run complete: {} processed, {} without unsubscribe info, {} failed",
        summary.processed, summary.failed_no_directive, summary.failed_execution
    );
    Ok(summary)
}

fn print_message_header(message: &MessageRecord) {
    println!("Processing: {}", message.id);
    println!("  From: {}", message.from.as_deref().unwrap_or(""));
    println!("  Subject: {}", message.subject.as_deref().unwrap_or(""));
}
