//! Notification delivery over the Slack Web API.

use serde::Deserialize;

use crate::engine::Messenger;
use crate::error::{DutySyncError, Result};
use crate::http::{client, read_json};
use crate::mapping::RecipientId;

const POST_MESSAGE_ENDPOINT: &str = "slack:chat.postMessage";

// ---------------------------------------------------------------------------
// SlackMessenger
// ---------------------------------------------------------------------------

pub struct SlackMessenger {
    client: reqwest::blocking::Client,
    token: String,
    api_base: String,
}

impl SlackMessenger {
    pub fn new(token: impl Into<String>, api_base: &str) -> Result<Self> {
        Ok(Self {
            client: client()?,
            token: token.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

/// The API wraps most outcomes in HTTP 200; the body's `ok` field is the
/// real acknowledgment.
#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl Messenger for SlackMessenger {
    fn send_direct_message(&self, recipient: &RecipientId, text: &str) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "channel": recipient.as_str(),
                "text": text,
            }))
            .send()?;
        let ack: PostMessageResponse = read_json(POST_MESSAGE_ENDPOINT, response)?;
        if !ack.ok {
            return Err(DutySyncError::SendRejected {
                recipient: recipient.to_string(),
                error: ack.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
