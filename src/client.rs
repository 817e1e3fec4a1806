//! Client coordinator
//!
//! Owns the capture pipeline, the conversation log, and the turn
//! orchestrator, and drives them from a command channel. Audio streams are
//! not `Send`, so the client runs on the thread that created it; only the
//! partial-transcription poller is spawned onto the runtime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::audio::{AudioCapture, PlaybackController};
use crate::config::Config;
use crate::conversation::ConversationLog;
use crate::events::{ClientEvent, EventBus};
use crate::orchestrator::{TurnContext, TurnOrchestrator};
use crate::services::{ChatClient, SttClient, Transcriber, TtsClient};
use crate::session::SessionGate;
use crate::transcript::{FinalTranscriber, PartialTranscriber, PartialUpdate};
use crate::Result;

/// Queued partial updates awaiting application
const PARTIAL_QUEUE: usize = 8;

/// Instruction from a frontend
#[derive(Debug, Clone)]
pub enum Command {
    /// Toggle the microphone: arm when idle, finalize when recording
    ToggleMic,
    /// Finalize the recording session if one is live
    DisarmMic,
    /// Send typed text as a user turn
    SubmitText(String),
    /// Stop playback, close any session, and exit the run loop
    Shutdown,
}

/// The voice/text chat client
pub struct Client {
    capture: AudioCapture,
    orchestrator: TurnOrchestrator,
    log: ConversationLog,
    gate: SessionGate,
    stt: Arc<dyn Transcriber>,
    finalizer: FinalTranscriber,
    events: EventBus,
    partial_tx: mpsc::Sender<PartialUpdate>,
    partial_rx: mpsc::Receiver<PartialUpdate>,
    poller: Option<JoinHandle<()>>,
    partial_interval: Duration,
}

impl Client {
    /// Assemble a client from its collaborators
    #[must_use]
    pub fn new(
        capture: AudioCapture,
        orchestrator: TurnOrchestrator,
        stt: Arc<dyn Transcriber>,
        partial_interval: Duration,
    ) -> Self {
        let (partial_tx, partial_rx) = mpsc::channel(PARTIAL_QUEUE);
        let finalizer = FinalTranscriber::new(Arc::clone(&stt), capture.sample_rate());

        Self {
            capture,
            orchestrator,
            log: ConversationLog::new(),
            gate: SessionGate::new(),
            stt,
            finalizer,
            events: EventBus::new(),
            partial_tx,
            partial_rx,
            poller: None,
            partial_interval,
        }
    }

    /// Assemble a client over the default devices and the configured backend
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let stt: Arc<dyn Transcriber> = Arc::new(SttClient::new(
            &config.backend_url,
            config.request_timeout,
        )?);
        let chat = Arc::new(ChatClient::new(&config.backend_url, config.request_timeout)?);
        let tts = Arc::new(TtsClient::new(&config.backend_url, config.request_timeout)?);

        let capture = AudioCapture::from_default_device(config.sample_rate);
        let orchestrator = TurnOrchestrator::new(
            chat,
            tts,
            PlaybackController::from_default_device(),
            config.speak_replies,
        );

        Ok(Self::new(
            capture,
            orchestrator,
            stt,
            config.partial_interval,
        ))
    }

    /// Subscribe to client events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// The conversation so far
    #[must_use]
    pub const fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Whether a recording session is live
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.capture.is_armed()
    }

    /// Toggle the microphone
    ///
    /// When idle this arms a fresh session and starts the partial poller;
    /// when recording it finalizes the session instead, so a single button
    /// press works for both halves of the gesture. Reply playback is
    /// interrupted so the user can speak over the assistant.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUnavailable` if the microphone cannot start
    /// (nothing is armed in that case), or a finalization error from the
    /// disarm half
    pub async fn toggle_mic(&mut self) -> Result<()> {
        if self.capture.is_armed() {
            return self.disarm_mic().await;
        }

        self.orchestrator.stop_playback();
        self.capture.arm()?;
        let token = self.gate.begin();

        let poller = PartialTranscriber::new(
            Arc::clone(&self.stt),
            self.capture.buffer_handle(),
            self.capture.sample_rate(),
            token,
            self.partial_tx.clone(),
        );
        self.poller = Some(tokio::spawn(poller.run(self.partial_interval)));

        self.events.emit(ClientEvent::RecordingStateChanged(true));
        tracing::info!("recording session started");
        Ok(())
    }

    /// Finalize the live recording session
    ///
    /// Stops the poller, closes the session so queued partials become
    /// stale, transcribes the full session audio, and runs the voice turn.
    /// A silent session leaves the conversation untouched. No-op when
    /// nothing is recording.
    ///
    /// # Errors
    ///
    /// Returns the transcription error when finalization fails (the live
    /// transcript is withdrawn and no chat request is made), or the turn
    /// error when the chat cycle fails after a successful transcript
    pub async fn disarm_mic(&mut self) -> Result<()> {
        if !self.capture.is_armed() {
            return Ok(());
        }

        if let Some(poller) = self.poller.take() {
            poller.abort();
        }

        let samples = self.capture.disarm();
        self.gate.close();
        self.events.emit(ClientEvent::RecordingStateChanged(false));

        let text = match self.finalizer.transcribe_session(&samples).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "final transcription failed");
                if self.log.discard_provisional() {
                    self.emit_conversation();
                }
                return Err(e);
            }
        };

        if text.is_empty() {
            tracing::debug!("session finalized to an empty transcript");
            if self.log.discard_provisional() {
                self.emit_conversation();
            }
            return Ok(());
        }

        self.events.emit(ClientEvent::FinalTranscript(text.clone()));

        let outcome = self
            .orchestrator
            .run_turn(&text, TurnContext::voice(), &mut self.log)
            .await;
        self.emit_conversation();
        outcome.map(|_| ())
    }

    /// Send typed text as a user turn
    ///
    /// Blank input is ignored without touching the conversation.
    ///
    /// # Errors
    ///
    /// Returns the turn error when the chat cycle fails; the user turn
    /// stays in the log
    pub async fn submit_text(&mut self, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        let outcome = self
            .orchestrator
            .run_turn(trimmed, TurnContext::typed(), &mut self.log)
            .await;
        self.emit_conversation();
        outcome.map(|_| ())
    }

    /// Apply a partial transcript if its session is still live
    pub fn apply_partial(&mut self, update: PartialUpdate) {
        if !self.gate.is_live(update.token) {
            tracing::debug!(text = %update.text, "stale partial discarded");
            return;
        }

        self.log.upsert_partial(&update.text);
        self.events
            .emit(ClientEvent::PartialTranscript(update.text));
        self.emit_conversation();
    }

    /// Process commands and partial updates until shutdown
    ///
    /// Commands run to completion one at a time; partials that arrive while
    /// a turn is in flight wait in the queue and are dropped by the session
    /// gate if they went stale in the meantime. Per-command errors are
    /// logged and the loop continues, so a backend outage never exits the
    /// client.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                Some(update) = self.partial_rx.recv() => {
                    self.apply_partial(update);
                }
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle(command).await {
                        break;
                    }
                }
            }
        }

        self.shutdown();
    }

    /// Execute one command, returning whether the loop should continue
    async fn handle(&mut self, command: Command) -> bool {
        let result = match command {
            Command::ToggleMic => self.toggle_mic().await,
            Command::DisarmMic => self.disarm_mic().await,
            Command::SubmitText(text) => self.submit_text(&text).await,
            Command::Shutdown => return false,
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "command failed");
        }
        true
    }

    /// Release audio resources on the way out
    fn shutdown(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        if self.capture.is_armed() {
            self.capture.disarm();
            self.gate.close();
        }
        self.orchestrator.stop_playback();
        tracing::info!("client shut down");
    }

    fn emit_conversation(&self) {
        self.events
            .emit(ClientEvent::ConversationChanged(self.log.turns().to_vec()));
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioBuffer, AudioChunk, AudioSink, InputDevice, PlaybackHandle};
    use crate::conversation::Speaker;
    use crate::services::{ChatBackend, SpeechSynthesizer};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedInput {
        chunk: Vec<f32>,
    }

    impl InputDevice for ScriptedInput {
        fn start(&mut self, buffer: Arc<Mutex<AudioBuffer>>) -> Result<()> {
            buffer
                .lock()
                .map_err(|_| Error::Audio("buffer poisoned".to_string()))?
                .push(AudioChunk::new(self.chunk.clone()));
            Ok(())
        }

        fn stop(&mut self) {}

        fn sample_rate(&self) -> u32 {
            16000
        }
    }

    struct FixedTranscriber {
        text: String,
    }

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _wav: Vec<u8>) -> Result<String> {
            Ok(self.text.clone())
        }
    }

    struct EchoChat;

    #[async_trait]
    impl ChatBackend for EchoChat {
        async fn send(&self, message: &str) -> Result<String> {
            Ok(format!("re: {message}"))
        }
    }

    struct UnusedTts;

    #[async_trait]
    impl SpeechSynthesizer for UnusedTts {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
            Err(Error::Synthesis("unused".to_string()))
        }
    }

    struct NullHandle;

    impl PlaybackHandle for NullHandle {
        fn stop(&mut self) {}
        fn is_finished(&self) -> bool {
            true
        }
    }

    struct NullSink;

    impl AudioSink for NullSink {
        fn begin(&mut self, _samples: Vec<f32>) -> Result<Box<dyn PlaybackHandle>> {
            Ok(Box::new(NullHandle))
        }
    }

    fn client(transcript: &str) -> Client {
        let capture = AudioCapture::new(Box::new(ScriptedInput {
            chunk: vec![0.1, 0.2],
        }));
        let orchestrator = TurnOrchestrator::new(
            Arc::new(EchoChat),
            Arc::new(UnusedTts),
            PlaybackController::new(Box::new(NullSink)),
            false,
        );
        Client::new(
            capture,
            orchestrator,
            Arc::new(FixedTranscriber {
                text: transcript.to_string(),
            }),
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn test_voice_session_produces_turn_pair() {
        let mut client = client("hello world");

        client.toggle_mic().await.expect("arm failed");
        assert!(client.is_recording());

        client.toggle_mic().await.expect("disarm failed");
        assert!(!client.is_recording());

        let turns = client.log().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, Speaker::User);
        assert_eq!(turns[0].text, "hello world");
        assert_eq!(turns[1].text, "re: hello world");
    }

    #[tokio::test]
    async fn test_empty_transcript_leaves_log_untouched() {
        let mut client = client("");

        client.toggle_mic().await.expect("arm failed");
        client.log.upsert_partial("uh");
        client.disarm_mic().await.expect("disarm failed");

        assert!(client.log().is_empty());
    }

    #[tokio::test]
    async fn test_stale_partial_discarded() {
        let mut client = client("unused");

        let stale = client.gate.begin();
        client.gate.close();
        client.apply_partial(PartialUpdate {
            token: stale,
            text: "ghost".to_string(),
        });
        assert!(client.log().is_empty());

        let live = client.gate.begin();
        client.apply_partial(PartialUpdate {
            token: live,
            text: "real".to_string(),
        });
        assert_eq!(client.log().len(), 1);
        assert!(client.log().has_provisional());
    }

    #[tokio::test]
    async fn test_blank_submit_is_ignored() {
        let mut client = client("unused");
        client.submit_text("   ").await.expect("submit failed");
        assert!(client.log().is_empty());
    }
}
