use crate::config::Config;
use crate::message::MessageRecord;
use crate::store::{MailSender, MessageStore};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use log::{debug, info, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Gmail REST API mailbox
pub struct GmailClient {
    client: Client,
    api_base: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    mime_type: Option<String>,
    #[serde(default)]
    headers: Vec<Header>,
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PartBody {
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListLabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct Label {
    id: String,
    name: String,
}

impl GmailClient {
    pub fn new(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Gmail HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Build a client using the token found in the configured environment variable
    pub fn from_config(config: &Config) -> Result<Self> {
        let var = &config.gmail.access_token_env;
        let token = std::env::var(var)
            .with_context(|| format!("Gmail access token not found in ${var}"))?;
        Self::new(&config.gmail.api_base, token, config.http_timeout())
    }

    pub async fn get_message(&self, message_id: &str) -> Result<MessageRecord> {
        let message: GmailMessage = self
            .get_json(&format!("messages/{message_id}"), &[("format", "full")])
            .await?;
        Ok(to_record(message))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;
        let response = check_status(response, path).await?;
        Ok(response.json().await?)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;
        let response = check_status(response, path).await?;
        Ok(response.json().await?)
    }
}

async fn check_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("Gmail API {} returned {}: {}", path, status, body)
}

#[async_trait]
impl MessageStore for GmailClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MessageRecord>> {
        let max_results = limit.to_string();
        let list: ListMessagesResponse = self
            .get_json("messages", &[("q", query), ("maxResults", max_results.as_str())])
            .await?;

        if list.messages.is_empty() {
            info!("No messages found matching query: {}", query);
            return Ok(Vec::new());
        }

        let mut messages = Vec::with_capacity(list.messages.len());
        for message_ref in list.messages.iter().take(limit) {
            messages.push(self.get_message(&message_ref.id).await?);
        }

        info!("Found {} messages matching query", messages.len());
        Ok(messages)
    }

    async fn find_label_id(&self, name: &str) -> Result<Option<String>> {
        let list: ListLabelsResponse = self.get_json("labels", &[]).await?;
        Ok(list
            .labels
            .into_iter()
            .find(|label| label.name.eq_ignore_ascii_case(name))
            .map(|label| label.id))
    }

    async fn create_label(&self, name: &str) -> Result<String> {
        let created = self
            .post_json(
                "labels",
                &json!({
                    "name": name,
                    "labelListVisibility": "labelShow",
                    "messageListVisibility": "show",
                }),
            )
            .await?;

        match created.get("id").and_then(Value::as_str) {
            Some(id) => Ok(id.to_string()),
            None => bail!("Gmail API did not return an id for new label '{}'", name),
        }
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<()> {
        self.post_json(
            &format!("messages/{message_id}/modify"),
            &json!({
                "addLabelIds": add_label_ids,
                "removeLabelIds": remove_label_ids,
            }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MailSender for GmailClient {
    async fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let raw = URL_SAFE_NO_PAD.encode(build_raw_message(to, subject, body));
        self.post_json("messages/send", &json!({ "raw": raw })).await?;
        info!("Sent unsubscribe email to {}", to);
        Ok(())
    }
}

fn to_record(message: GmailMessage) -> MessageRecord {
    let mut record = MessageRecord::new(message.id);

    if let Some(payload) = &message.payload {
        for header in &payload.headers {
            match header.name.to_ascii_lowercase().as_str() {
                "subject" => record.subject = Some(header.value.clone()),
                "from" => record.from = Some(header.value.clone()),
                "list-unsubscribe" => record.list_unsubscribe = Some(header.value.clone()),
                _ => {}
            }
        }
        collect_bodies(payload, &mut record);
    }

    record
}

// First text/html and text/plain parts win
fn collect_bodies(part: &MessagePart, record: &mut MessageRecord) {
    let data = part.body.as_ref().and_then(|body| body.data.as_deref());

    if let (Some(mime_type), Some(data)) = (part.mime_type.as_deref(), data) {
        let slot = match mime_type.to_ascii_lowercase().as_str() {
            "text/html" => Some(&mut record.html_body),
            "text/plain" => Some(&mut record.text_body),
            _ => None,
        };
        if let Some(slot) = slot {
            if slot.is_none() {
                match decode_base64url(data) {
                    Some(text) => *slot = Some(text),
                    None => warn!("Undecodable {} part in message {}", mime_type, record.id),
                }
            }
        }
    }

    for child in &part.parts {
        collect_bodies(child, record);
    }
}

fn decode_base64url(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(data.trim().trim_end_matches('='))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn build_raw_message(to: &str, subject: &str, body: &str) -> String {
    let to = strip_line_breaks(to);
    let subject = strip_line_breaks(subject);
    let subject = if subject.is_ascii() {
        subject
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    };
    debug!("Composing unsubscribe email to {}", to);

    format!(
        "To: {to}\r\nSubject: {subject}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}"
    )
}

fn strip_line_breaks(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
