//! Final transcription of a completed session

use std::sync::Arc;

use crate::audio::samples_to_wav;
use crate::services::Transcriber;
use crate::Result;

/// Produces the authoritative transcript for a finished recording session
///
/// Called exactly once per session, after disarm. Unlike the partial poller
/// its failures are surfaced: without a final transcript there is no user
/// turn and nothing is sent to chat.
pub struct FinalTranscriber {
    stt: Arc<dyn Transcriber>,
    sample_rate: u32,
}

impl FinalTranscriber {
    /// Create a finalizer over the given transcription backend
    #[must_use]
    pub fn new(stt: Arc<dyn Transcriber>, sample_rate: u32) -> Self {
        Self { stt, sample_rate }
    }

    /// Transcribe the complete session audio
    ///
    /// Returns an empty string for a silent session (no samples, or a blank
    /// transcript); the caller treats that like an empty submission.
    ///
    /// # Errors
    ///
    /// Returns `Error::Audio` if the samples cannot be encoded, or
    /// `Error::Transcription` if the backend fails
    pub async fn transcribe_session(&self, samples: &[f32]) -> Result<String> {
        if samples.is_empty() {
            tracing::debug!("session captured no audio, skipping transcription");
            return Ok(String::new());
        }

        let wav = samples_to_wav(samples, self.sample_rate)?;
        tracing::debug!(
            samples = samples.len(),
            wav_bytes = wav.len(),
            "finalizing session transcript"
        );

        let text = self.stt.transcribe(wav).await?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingTranscriber {
        reply: String,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Transcriber for RecordingTranscriber {
        async fn transcribe(&self, _wav: Vec<u8>) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.reply.clone())
        }
    }

    struct FailingTranscriber;

    #[async_trait]
    impl Transcriber for FailingTranscriber {
        async fn transcribe(&self, _wav: Vec<u8>) -> Result<String> {
            Err(Error::Transcription("backend down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_silent_session_skips_backend() {
        let stt = Arc::new(RecordingTranscriber {
            reply: "unused".to_string(),
            calls: Mutex::new(0),
        });
        let finalizer = FinalTranscriber::new(Arc::clone(&stt) as Arc<dyn Transcriber>, 16000);

        let text = finalizer
            .transcribe_session(&[])
            .await
            .expect("transcription failed");

        assert!(text.is_empty());
        assert_eq!(*stt.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transcript_is_trimmed() {
        let stt = Arc::new(RecordingTranscriber {
            reply: "  hello world \n".to_string(),
            calls: Mutex::new(0),
        });
        let finalizer = FinalTranscriber::new(stt, 16000);

        let text = finalizer
            .transcribe_session(&[0.1, 0.2])
            .await
            .expect("transcription failed");

        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_backend_failure_is_surfaced() {
        let finalizer = FinalTranscriber::new(Arc::new(FailingTranscriber), 16000);

        let err = finalizer
            .transcribe_session(&[0.1])
            .await
            .expect_err("expected failure");

        assert!(matches!(err, Error::Transcription(_)));
    }
}
