//! Text-to-speech client

use async_trait::async_trait;
use std::time::Duration;

use super::SpeechSynthesizer;
use crate::{Error, Result};

/// HTTP client for the backend's `/tts` endpoint
pub struct TtsClient {
    client: reqwest::Client,
    base_url: String,
}

impl TtsClient {
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
impl SpeechSynthesizer for TtsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            message: &'a str,
        }

        tracing::debug!(chars = text.len(), "requesting synthesis");

        let response = self
            .client
            .post(format!("{}/tts", self.base_url))
            .json(&TtsRequest { message: text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?.to_vec();

        // The backend reports synthesis problems as a JSON body with a 200
        // status, so sniff for that before treating the payload as audio.
        if let Some(message) = error_payload(&audio) {
            return Err(Error::Synthesis(message));
        }

        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio)
    }
}

/// Extract the error message from a JSON error payload, if that is what
/// the body holds
fn error_payload(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return Some("empty synthesis payload".to_string());
    }
    if body[0] != b'{' {
        return None;
    }
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let error = value.get("error")?;
    Some(
        error
            .as_str()
            .map_or_else(|| error.to_string(), ToString::to_string),
    )
}
