//! Speech-to-text client

use async_trait::async_trait;
use std::time::Duration;

use super::Transcriber;
use crate::{Error, Result};

/// Response from the transcription endpoint
#[derive(serde::Deserialize)]
struct TranscriptResponse {
    reply: String,
}

/// HTTP client for the backend's `/stt` endpoint
pub struct SttClient {
    client: reqwest::Client,
    base_url: String,
}

impl SttClient {
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
impl Transcriber for SttClient {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "starting transcription");

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(wav)
                .file_name("audio.wav")
                .mime_str("audio/wav")
                .map_err(|e| Error::Transcription(e.to_string()))?,
        );

        let response = self
            .client
            .post(format!("{}/stt", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "STT request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transcription(format!(
                "STT error {status}: {body}"
            )));
        }

        let result: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("malformed STT response: {e}")))?;

        tracing::debug!(transcript = %result.reply, "transcription complete");
        Ok(result.reply)
    }
}
