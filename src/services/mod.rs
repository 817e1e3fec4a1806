//! Remote collaborator clients
//!
//! STT, chat, and TTS are consumed over HTTP from a single backend. Each
//! client sits behind a trait so orchestration can be driven by fakes in
//! tests.

mod chat;
mod stt;
mod tts;

pub use chat::ChatClient;
pub use stt::SttClient;
pub use tts::TtsClient;

use async_trait::async_trait;

use crate::Result;

/// Converts captured audio to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe WAV-encoded audio
    ///
    /// An empty transcript is a valid result (silence, no speech).
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String>;
}

/// Produces assistant replies
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a user message and return the assistant's reply
    async fn send(&self, message: &str) -> Result<String>;
}

/// Converts reply text to audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech, returning MP3 bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
