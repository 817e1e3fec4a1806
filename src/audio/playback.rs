//! Audio playback to speakers

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// A running playback that can be stopped
pub trait PlaybackHandle {
    /// Halt playback and release the output stream
    fn stop(&mut self);

    /// Whether all samples have been played
    fn is_finished(&self) -> bool;
}

/// Output device that starts playback sessions
///
/// Implemented by the cpal speaker in production and by recording fakes in
/// tests.
pub trait AudioSink {
    /// Begin playing `samples`, returning immediately with a handle
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot start
    fn begin(&mut self, samples: Vec<f32>) -> Result<Box<dyn PlaybackHandle>>;
}

/// Speaker output over the default cpal output device
///
/// The device is resolved each time a session begins, so a speaker that is
/// absent at startup only fails the playback that needs it.
#[derive(Default)]
pub struct CpalSink;

impl CpalSink {
    /// Create a speaker sink
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolve the default output device and a config at the playback rate
    ///
    /// Prefers a mono config, falling back to stereo.
    fn resolve() -> Result<(Device, StreamConfig)> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "output device resolved"
        );

        Ok((device, config))
    }
}

struct CpalHandle {
    stream: Option<cpal::Stream>,
    finished: Arc<Mutex<bool>>,
}

impl PlaybackHandle for CpalHandle {
    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("playback stopped");
        }
    }

    fn is_finished(&self) -> bool {
        self.finished.lock().map(|f| *f).unwrap_or(true)
    }
}

impl AudioSink for CpalSink {
    fn begin(&mut self, samples: Vec<f32>) -> Result<Box<dyn PlaybackHandle>> {
        let (device, config) = Self::resolve()?;
        let channels = config.channels as usize;
        let sample_count = samples.len();

        let samples = Arc::new(Mutex::new(samples));
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(Mutex::new(sample_count == 0));
        let finished_clone = Arc::clone(&finished);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(samples) = samples.lock() else {
                        return;
                    };
                    let Ok(mut pos) = position.lock() else {
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < samples.len() {
                            samples[*pos]
                        } else {
                            if let Ok(mut f) = finished_clone.lock() {
                                *f = true;
                            }
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }

                        if *pos < samples.len() {
                            *pos += 1;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::debug!(samples = sample_count, "playback started");

        Ok(Box::new(CpalHandle {
            stream: Some(stream),
            finished,
        }))
    }
}

/// Wraps the single active output handle
///
/// At most one instance exists at a time; a superseded session is stopped
/// and released before its replacement is created.
pub struct PlaybackSession {
    handle: Box<dyn PlaybackHandle>,
}

impl PlaybackSession {
    const fn new(handle: Box<dyn PlaybackHandle>) -> Self {
        Self { handle }
    }

    fn stop(&mut self) {
        self.handle.stop();
    }

    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Owns the speaker and serializes playback sessions
pub struct PlaybackController {
    sink: Box<dyn AudioSink>,
    session: Option<PlaybackSession>,
}

impl PlaybackController {
    /// Create a controller over the given sink
    #[must_use]
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            session: None,
        }
    }

    /// Create a controller over the default speaker
    ///
    /// The device itself is resolved lazily when playback begins, so this
    /// never fails even on machines without a speaker.
    #[must_use]
    pub fn from_default_device() -> Self {
        Self::new(Box::new(CpalSink::new()))
    }

    /// Play `samples`, stopping any session already active
    ///
    /// # Errors
    ///
    /// Returns error if the new session cannot start; the prior session is
    /// stopped regardless
    pub fn play(&mut self, samples: Vec<f32>) -> Result<()> {
        self.stop();
        let handle = self.sink.begin(samples)?;
        self.session = Some(PlaybackSession::new(handle));
        Ok(())
    }

    /// Decode MP3 bytes and play them
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` on a malformed payload, or a playback
    /// error if the session cannot start
    pub fn play_mp3(&mut self, mp3_data: &[u8]) -> Result<()> {
        let samples = decode_mp3(mp3_data)?;
        self.play(samples)
    }

    /// Halt the active session, if any, and release its resources
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }

    /// Whether a session is active and still playing
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_finished())
    }
}

/// Decode MP3 bytes to f32 samples
///
/// Stereo frames are averaged to mono.
///
/// # Errors
///
/// Returns `Error::Synthesis` if the payload is not decodable audio
pub fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    // Stereo: average channels
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            f32::midpoint(left, right)
                        })
                        .collect()
                } else {
                    // Mono
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Synthesis(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() {
        return Err(Error::Synthesis("payload contained no audio".to_string()));
    }

    Ok(samples)
}
