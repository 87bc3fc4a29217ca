pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod extractor;
pub mod gmail;
pub mod header_parser;
pub mod labels;
pub mod link_scanner;
pub mod message;
pub mod runner;
pub mod store;

#[cfg(test)]
mod test_support;

pub use classifier::classify;
pub use config::{Config, Mode};
pub use dispatcher::{ExecutionOutcome, FailureReason, UnsubscribeExecutor};
pub use extractor::extract_directive;
pub use gmail::GmailClient;
pub use header_parser::parse_list_unsubscribe;
pub use labels::{LabelCache, LabelTransitionController, TerminalState};
pub use link_scanner::scan_unsubscribe_links;
pub use message::{MessageRecord, UnsubscribeDirective, UnsubscribeMethod};
pub use runner::{run, RunSettings, RunSummary};
pub use store::{MailSender, MessageStore};
