//! TOML configuration file loading
//!
//! Supports `~/.config/omni/parley/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ParleyConfigFile {
    /// Assistant backend configuration
    #[serde(default)]
    pub backend: BackendFileConfig,

    /// Audio capture/playback configuration
    #[serde(default)]
    pub audio: AudioFileConfig,
}

/// Assistant backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    /// Base URL for the STT/chat/TTS services (e.g. "http://localhost:8000")
    pub url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Audio configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Capture sample rate in Hz (e.g. 16000)
    pub sample_rate: Option<u32>,

    /// Partial transcription cadence in milliseconds
    pub partial_interval_ms: Option<u64>,

    /// Speak assistant replies to voice turns aloud
    pub speak_replies: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ParleyConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ParleyConfigFile {
    let Some(path) = config_file_path() else {
        return ParleyConfigFile::default();
    };

    if !path.exists() {
        return ParleyConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config_file(&content, &path),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ParleyConfigFile::default()
        }
    }
}

/// Parse file contents, falling back to defaults on malformed TOML
fn parse_config_file(content: &str, path: &std::path::Path) -> ParleyConfigFile {
    match toml::from_str(content) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse config file, using defaults"
            );
            ParleyConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/omni/parley/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("parley")
            .join("config.toml")
    })
}
