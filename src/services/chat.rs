//! Chat backend client

use async_trait::async_trait;
use std::time::Duration;

use super::ChatBackend;
use crate::{Error, Result};

/// Response from the chat endpoint
#[derive(serde::Deserialize)]
struct ChatResponse {
    reply: String,
}

/// HTTP client for the backend's `/chat` endpoint
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// Create a client for the given backend base URL
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn send(&self, message: &str) -> Result<String> {
        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            message: &'a str,
        }

        tracing::debug!(chars = message.len(), "sending chat message");

        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Chat(format!("chat error {status}: {body}")));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Chat(format!("malformed chat response: {e}")))?;

        tracing::debug!(chars = result.reply.len(), "chat reply received");
        Ok(result.reply)
    }
}
