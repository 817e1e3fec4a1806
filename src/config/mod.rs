//! Configuration management for the parley client

pub mod file;

use std::time::Duration;

use file::ParleyConfigFile;

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default capture sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Default partial transcription cadence in milliseconds
pub const DEFAULT_PARTIAL_INTERVAL_MS: u64 = 500;

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parley client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL for the STT/chat/TTS backend
    pub backend_url: String,

    /// HTTP request timeout
    pub request_timeout: Duration,

    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Partial transcription cadence
    pub partial_interval: Duration,

    /// Speak assistant replies to voice turns aloud
    pub speak_replies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sample_rate: DEFAULT_SAMPLE_RATE,
            partial_interval: Duration::from_millis(DEFAULT_PARTIAL_INTERVAL_MS),
            speak_replies: true,
        }
    }
}

impl Config {
    /// Load configuration with priority: env > config file > defaults
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();
        Self::resolve(&fc)
    }

    /// Merge the file overlay and environment on top of defaults
    fn resolve(fc: &ParleyConfigFile) -> Self {
        let backend_url = std::env::var("PARLEY_BACKEND_URL")
            .ok()
            .or_else(|| fc.backend.url.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let timeout_secs = std::env::var("PARLEY_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .or(fc.backend.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let sample_rate = std::env::var("PARLEY_SAMPLE_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .or(fc.audio.sample_rate)
            .unwrap_or(DEFAULT_SAMPLE_RATE);

        let partial_interval_ms = std::env::var("PARLEY_PARTIAL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .or(fc.audio.partial_interval_ms)
            .unwrap_or(DEFAULT_PARTIAL_INTERVAL_MS);

        let speak_replies = std::env::var("PARLEY_SPEAK_REPLIES")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .or(fc.audio.speak_replies)
            .unwrap_or(true);

        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(timeout_secs),
            sample_rate,
            partial_interval: Duration::from_millis(partial_interval_ms),
            speak_replies,
        }
    }
}
