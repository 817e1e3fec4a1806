//! Error types for the parley client

use thiserror::Error;

/// Result type alias for parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the parley client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone missing, busy, or permission denied
    #[error("input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Audio encode/decode or device stream error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text call failed or returned a malformed response
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// Chat backend call failed
    #[error("chat request failed: {0}")]
    Chat(String),

    /// Speech synthesis failed or returned a non-audio payload
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
