//! Periodic partial transcription of the live session

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::audio::{samples_to_wav, AudioBuffer};
use crate::services::Transcriber;
use crate::session::SessionToken;

/// Provisional transcript tagged with its recording session
///
/// The receiver drops updates whose token no longer matches the live
/// session, so a slow transcription finishing after disarm cannot resurrect
/// stale text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialUpdate {
    /// Session the audio belongs to
    pub token: SessionToken,
    /// Transcript of everything captured so far
    pub text: String,
}

/// Polls the session buffer and transcribes it on a fixed cadence
///
/// Each poll snapshots the buffer without consuming it, so the finalized
/// transcript always covers the full session. Transcription failures are
/// logged and swallowed; the next tick simply tries again with more audio.
pub struct PartialTranscriber {
    stt: Arc<dyn Transcriber>,
    buffer: Arc<Mutex<AudioBuffer>>,
    sample_rate: u32,
    token: SessionToken,
    updates: mpsc::Sender<PartialUpdate>,
}

impl PartialTranscriber {
    /// Create a poller for one recording session
    #[must_use]
    pub fn new(
        stt: Arc<dyn Transcriber>,
        buffer: Arc<Mutex<AudioBuffer>>,
        sample_rate: u32,
        token: SessionToken,
        updates: mpsc::Sender<PartialUpdate>,
    ) -> Self {
        Self {
            stt,
            buffer,
            sample_rate,
            token,
            updates,
        }
    }

    /// Run one poll cycle, returning whether an update was published
    ///
    /// Skips silently when the buffer is empty or the transcript comes back
    /// blank. A transcription failure is logged at warn and treated as a
    /// skipped tick.
    pub async fn poll_once(&self) -> bool {
        let samples = self
            .buffer
            .lock()
            .map(|buf| buf.snapshot())
            .unwrap_or_default();

        if samples.is_empty() {
            return false;
        }

        let wav = match samples_to_wav(&samples, self.sample_rate) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::warn!(error = %e, "partial transcription skipped, WAV encoding failed");
                return false;
            }
        };

        let text = match self.stt.transcribe(wav).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "partial transcription failed, will retry next tick");
                return false;
            }
        };

        if text.trim().is_empty() {
            return false;
        }

        let update = PartialUpdate {
            token: self.token,
            text,
        };

        if self.updates.send(update).await.is_err() {
            tracing::debug!("partial update dropped, receiver gone");
            return false;
        }

        true
    }

    /// Poll on `interval` until the task is aborted
    ///
    /// Each transcription round-trip completes before the next tick is
    /// considered, so a slow backend stretches the cadence instead of
    /// stacking requests.
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}
