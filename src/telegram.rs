use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::TransportError;

/// Telegram rejects messages over 4096 characters; stay under it in bytes.
const MAX_MESSAGE_LEN: usize = 4000;

/// Request/response seam to the Bot API.
///
/// Implementations return the `result` field of a successful envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

/// reqwest-backed transport for `https://api.telegram.org`.
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HttpTransport {
    /// `request_timeout` must exceed the long-poll timeout or every idle poll
    /// ends in a client-side timeout.
    pub fn new(api_url: &str, token: &str, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let url = format!("{}/bot{}/{}", self.api_url, self.token, method);

        debug!(method, "Calling Bot API");

        // without_url keeps the token out of error messages
        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.without_url()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Body(e.to_string()))?;

        if !envelope.ok {
            return Err(TransportError::Api {
                description: envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

/// Handle to the bot, shared with command handlers.
#[derive(Clone)]
pub struct Bot {
    transport: Arc<dyn Transport>,
    username: String,
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Bot {
    /// Verify the credential with `getMe` before anything else runs.
    pub async fn connect(transport: Arc<dyn Transport>) -> Result<Self, TransportError> {
        let username = fetch_username(transport.as_ref()).await?;
        info!("Connected to Telegram bot: @{}", username);
        Ok(Self {
            transport,
            username,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The bot's display name as currently reported by the API.
    pub async fn get_me(&self) -> Result<String, TransportError> {
        fetch_username(self.transport.as_ref()).await
    }

    /// Raw `getUpdates` result; decoding is left to the caller.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Value, TransportError> {
        self.transport
            .call(
                "getUpdates",
                json!({ "offset": offset, "timeout": timeout_secs }),
            )
            .await
    }

    /// Send `text` to `chat_id`, split into several messages if too long.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            self.transport
                .call("sendMessage", json!({ "chat_id": chat_id, "text": chunk }))
                .await?;
        }
        Ok(())
    }
}

async fn fetch_username(transport: &dyn Transport) -> Result<String, TransportError> {
    let me = transport.call("getMe", json!({})).await?;
    me.get("username")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TransportError::Body("getMe returned no username".to_string()))
}

/// Break `text` into pieces of at most `max_len` bytes, cutting after the
/// last newline in range, else after the last space, else at the limit.
fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_len {
        // never cut inside a multi-byte character
        let mut limit = max_len;
        while !rest.is_char_boundary(limit) {
            limit -= 1;
        }
        if limit == 0 {
            limit = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let window = &rest[..limit];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map_or(limit, |pos| pos + 1);

        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }

    chunks.push(rest);
    chunks
}
