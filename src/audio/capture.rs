//! Audio capture from microphone

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::{AudioBuffer, AudioChunk};
use crate::{Error, Result};

/// Source of captured audio samples
///
/// Implemented by the cpal microphone in production and by scripted fakes
/// in tests, so the capture state machine never needs real hardware.
pub trait InputDevice {
    /// Begin appending captured chunks to `buffer`
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUnavailable` if the device cannot start
    fn start(&mut self, buffer: Arc<Mutex<AudioBuffer>>) -> Result<()>;

    /// Stop capturing
    fn stop(&mut self);

    /// Capture sample rate in Hz
    fn sample_rate(&self) -> u32;
}

/// Microphone capture over the default cpal input device
///
/// The device is resolved each time a session starts, so a microphone that
/// is absent at startup only fails the session that tries to arm it.
pub struct CpalInput {
    sample_rate: u32,
    stream: Option<Stream>,
}

impl CpalInput {
    /// Create a capture source at the requested sample rate
    #[must_use]
    pub const fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stream: None,
        }
    }

    /// Resolve the default input device and a mono config at our rate
    fn resolve(&self) -> Result<(Device, StreamConfig)> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::DeviceUnavailable("no input device".to_string()))?;

        let sample_rate = self.sample_rate;
        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .ok_or_else(|| {
                Error::DeviceUnavailable(format!("no mono input config at {sample_rate} Hz"))
            })?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "input device resolved"
        );

        Ok((device, config))
    }
}

impl InputDevice for CpalInput {
    fn start(&mut self, buffer: Arc<Mutex<AudioBuffer>>) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let (device, config) = self.resolve()?;

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.push(AudioChunk::new(data.to_vec()));
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Owns the microphone and the session buffer
///
/// Only one session may be armed at a time. Arming resets the buffer; the
/// buffer grows monotonically while armed and is finalized on disarm.
pub struct AudioCapture {
    device: Box<dyn InputDevice>,
    buffer: Arc<Mutex<AudioBuffer>>,
    armed: bool,
}

impl AudioCapture {
    /// Create a capture instance over the given device
    #[must_use]
    pub fn new(device: Box<dyn InputDevice>) -> Self {
        Self {
            device,
            buffer: Arc::new(Mutex::new(AudioBuffer::new())),
            armed: false,
        }
    }

    /// Create a capture instance over the default microphone
    ///
    /// The device itself is resolved lazily when a session is armed, so
    /// this never fails even on machines without a microphone.
    #[must_use]
    pub fn from_default_device(sample_rate: u32) -> Self {
        Self::new(Box::new(CpalInput::new(sample_rate)))
    }

    /// Start a recording session with a fresh buffer
    ///
    /// No-op if a session is already armed.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUnavailable` if the device cannot start;
    /// capture stays disarmed in that case
    pub fn arm(&mut self) -> Result<()> {
        if self.armed {
            return Ok(());
        }

        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }

        self.device.start(Arc::clone(&self.buffer))?;
        self.armed = true;

        tracing::debug!("capture armed");
        Ok(())
    }

    /// Stop the session and return the finalized samples
    ///
    /// Returns an empty vec when nothing was captured (silence) or when no
    /// session was armed.
    pub fn disarm(&mut self) -> Vec<f32> {
        if !self.armed {
            return Vec::new();
        }

        self.device.stop();
        self.armed = false;

        let samples = self
            .buffer
            .lock()
            .map(|buf| buf.snapshot())
            .unwrap_or_default();

        tracing::debug!(samples = samples.len(), "capture disarmed");
        samples
    }

    /// Whether a recording session is armed
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Shared handle to the session buffer, for partial transcription
    #[must_use]
    pub fn buffer_handle(&self) -> Arc<Mutex<AudioBuffer>> {
        Arc::clone(&self.buffer)
    }

    /// Capture sample rate in Hz
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.device.sample_rate()
    }
}
