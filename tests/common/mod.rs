//! Shared test utilities
//!
//! Scripted collaborators so the pipeline can be exercised without audio
//! hardware or a running backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley::audio::{AudioBuffer, AudioChunk, AudioSink, InputDevice, PlaybackHandle};
use parley::config::DEFAULT_SAMPLE_RATE;
use parley::services::{ChatBackend, SpeechSynthesizer, Transcriber};
use parley::{Error, Result};

/// Generate sine wave audio samples
pub fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (DEFAULT_SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / DEFAULT_SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
pub fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (DEFAULT_SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// Microphone that appends a fixed chunk when a session starts
pub struct ScriptedMic {
    pub chunk: Vec<f32>,
}

impl InputDevice for ScriptedMic {
    fn start(&mut self, buffer: Arc<Mutex<AudioBuffer>>) -> Result<()> {
        buffer
            .lock()
            .map_err(|_| Error::Audio("buffer poisoned".to_string()))?
            .push(AudioChunk::new(self.chunk.clone()));
        Ok(())
    }

    fn stop(&mut self) {}

    fn sample_rate(&self) -> u32 {
        DEFAULT_SAMPLE_RATE
    }
}

/// Transcriber that replays a scripted sequence of results
///
/// Once the script runs out it returns empty transcripts.
pub struct ScriptedTranscriber {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<usize>,
}

impl ScriptedTranscriber {
    #[must_use]
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(0),
        }
    }

    /// Transcriber whose next (and only) result is `text`
    #[must_use]
    pub fn fixed(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Number of transcription requests received
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _wav: Vec<u8>) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Chat backend that records messages and returns a canned reply
pub struct FakeChat {
    reply: Option<String>,
    messages: Mutex<Vec<String>>,
}

impl FakeChat {
    /// Backend that answers every message with `reply`
    #[must_use]
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Backend that fails every request
    #[must_use]
    pub fn failing() -> Self {
        Self {
            reply: None,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Messages received so far
    #[must_use]
    pub fn received(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for FakeChat {
    async fn send(&self, message: &str) -> Result<String> {
        self.messages.lock().unwrap().push(message.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Chat("backend down".to_string()))
    }
}

/// Synthesizer that returns canned bytes or fails
pub struct FakeSynthesizer {
    audio: Option<Vec<u8>>,
    calls: Mutex<usize>,
}

impl FakeSynthesizer {
    #[must_use]
    pub fn returning(audio: Vec<u8>) -> Self {
        Self {
            audio: Some(audio),
            calls: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            audio: None,
            calls: Mutex::new(0),
        }
    }

    /// Number of synthesis requests received
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        *self.calls.lock().unwrap() += 1;
        self.audio
            .clone()
            .ok_or_else(|| Error::Synthesis("backend down".to_string()))
    }
}

struct RecordedHandle;

impl PlaybackHandle for RecordedHandle {
    fn stop(&mut self) {}
    fn is_finished(&self) -> bool {
        true
    }
}

/// Output sink that records the sample count of every session it starts
pub struct RecordingSink {
    begun: Arc<Mutex<Vec<usize>>>,
}

impl RecordingSink {
    /// Create a sink plus a shared view of the sessions it has begun
    #[must_use]
    pub fn new() -> (Self, Arc<Mutex<Vec<usize>>>) {
        let begun = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                begun: Arc::clone(&begun),
            },
            begun,
        )
    }
}

impl AudioSink for RecordingSink {
    fn begin(&mut self, samples: Vec<f32>) -> Result<Box<dyn PlaybackHandle>> {
        self.begun.lock().unwrap().push(samples.len());
        Ok(Box::new(RecordedHandle))
    }
}
