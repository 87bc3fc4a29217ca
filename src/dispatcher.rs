use crate::classifier::has_mailto_prefix;
use crate::message::{UnsubscribeDirective, UnsubscribeMethod};
use crate::store::MailSender;
use log::{debug, info, warn};
use percent_encoding::percent_decode_str;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAILTO_SUBJECT: &str = "Unsubscribe";
pub const DEFAULT_MAILTO_BODY: &str = "Please unsubscribe me from this mailing list.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessDetail {
    HttpStatus(u16),
    MailSent { to: String },
}

impl fmt::Display for SuccessDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessDetail::HttpStatus(status) => write!(f, "HTTP {status}"),
            SuccessDetail::MailSent { to } => write!(f, "email sent to {to}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("HTTP {0}")]
    HttpStatus(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid mailto URI: {0}")]
    InvalidMailto(String),
    #[error("send failed: {0}")]
    Send(String),
}

/// Result of one execution attempt. Faults never escape `execute`; they end
/// up here as a `Failure` with the reason kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success(SuccessDetail),
    Failure(FailureReason),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }
}

/// Recipient, subject and body pulled out of a `mailto:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailtoRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Parse a `mailto:` URI, filling in the default subject and body when the
/// query leaves them out or empty. Returns `None` when the scheme prefix is
/// missing or there is no recipient.
pub fn parse_mailto(uri: &str) -> Option<MailtoRequest> {
    let uri = uri.trim();
    if !has_mailto_prefix(uri) {
        return None;
    }

    // '#' has no fragment meaning in mailto, keep it as part of the value
    let parsed = Url::parse(&uri.replace('#', "%23")).ok()?;
    let to = percent_decode_str(parsed.path())
        .decode_utf8()
        .ok()?
        .trim()
        .to_string();
    if to.is_empty() {
        return None;
    }

    let mut subject = None;
    let mut body = None;
    for (key, value) in parsed.query_pairs() {
        if value.is_empty() {
            continue;
        }
        if key.eq_ignore_ascii_case("subject") && subject.is_none() {
            subject = Some(value.into_owned());
        } else if key.eq_ignore_ascii_case("body") && body.is_none() {
            body = Some(value.into_owned());
        }
    }

    Some(MailtoRequest {
        to,
        subject: subject.unwrap_or_else(|| DEFAULT_MAILTO_SUBJECT.to_string()),
        body: body.unwrap_or_else(|| DEFAULT_MAILTO_BODY.to_string()),
    })
}

/// Carries out unsubscribe directives over HTTP or email
pub struct UnsubscribeExecutor {
    client: Client,
    mail_sender: Arc<dyn MailSender>,
}

impl UnsubscribeExecutor {
    pub fn new(
        mail_sender: Arc<dyn MailSender>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        // Redirects are left unfollowed so GET can count 301/302 as accepted
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            mail_sender,
        })
    }

    pub fn with_defaults(mail_sender: Arc<dyn MailSender>) -> Result<Self, reqwest::Error> {
        Self::new(
            mail_sender,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_USER_AGENT,
        )
    }

    /// Execute a directive and report whether the unsubscribe was accepted.
    pub async fn execute(&self, directive: &UnsubscribeDirective) -> ExecutionOutcome {
        info!(
            "Executing unsubscribe for message {} using method {}",
            directive.message_id, directive.method
        );

        let outcome = match directive.method {
            UnsubscribeMethod::Get => self.execute_get(directive).await,
            UnsubscribeMethod::Post => self.execute_post(directive).await,
            UnsubscribeMethod::Mailto => self.execute_mailto(directive).await,
        };

        match &outcome {
            ExecutionOutcome::Success(detail) => info!(
                "Unsubscribe succeeded for message {} ({} {}): {}",
                directive.message_id, directive.method, directive.target, detail
            ),
            ExecutionOutcome::Failure(reason) => warn!(
                "Unsubscribe failed for message {} ({} {}): {}",
                directive.message_id, directive.method, directive.target, reason
            ),
        }

        outcome
    }

    async fn execute_get(&self, directive: &UnsubscribeDirective) -> ExecutionOutcome {
        debug!("Sending HTTP GET to {}", directive.target);

        let request = with_extra_headers(self.client.get(&directive.target), directive);
        let status = match request.send().await {
            Ok(response) => response.status(),
            Err(e) => return ExecutionOutcome::Failure(FailureReason::Transport(e.to_string())),
        };

        if status.is_success()
            || status == StatusCode::MOVED_PERMANENTLY
            || status == StatusCode::FOUND
        {
            ExecutionOutcome::Success(SuccessDetail::HttpStatus(status.as_u16()))
        } else {
            ExecutionOutcome::Failure(FailureReason::HttpStatus(status.as_u16()))
        }
    }

    async fn execute_post(&self, directive: &UnsubscribeDirective) -> ExecutionOutcome {
        debug!("Sending HTTP POST to {}", directive.target);

        let request = with_extra_headers(self.client.post(&directive.target), directive);
        let status = match request.body(String::new()).send().await {
            Ok(response) => response.status(),
            Err(e) => return ExecutionOutcome::Failure(FailureReason::Transport(e.to_string())),
        };

        // A redirected POST is not trusted as an accepted unsubscribe
        if status.is_success() {
            ExecutionOutcome::Success(SuccessDetail::HttpStatus(status.as_u16()))
        } else {
            ExecutionOutcome::Failure(FailureReason::HttpStatus(status.as_u16()))
        }
    }

    async fn execute_mailto(&self, directive: &UnsubscribeDirective) -> ExecutionOutcome {
        let request = match parse_mailto(&directive.target) {
            Some(request) => request,
            None => {
                return ExecutionOutcome::Failure(FailureReason::InvalidMailto(
                    directive.target.clone(),
                ))
            }
        };

        debug!(
            "Sending unsubscribe email to {} with subject: {}",
            request.to, request.subject
        );

        match self
            .mail_sender
            .send_message(&request.to, &request.subject, &request.body)
            .await
        {
            Ok(()) => ExecutionOutcome::Success(SuccessDetail::MailSent { to: request.to }),
            Err(e) => ExecutionOutcome::Failure(FailureReason::Send(e.to_string())),
        }
    }
}

fn with_extra_headers(
    mut request: RequestBuilder,
    directive: &UnsubscribeDirective,
) -> RequestBuilder {
    if let Some(headers) = &directive.headers {
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
    }
    request
}
