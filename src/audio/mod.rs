//! Audio capture and playback
//!
//! Capture produces 16kHz mono f32 samples. Buffers are encoded as
//! 16-bit PCM WAV before upload to the STT service.

mod capture;
mod playback;

pub use capture::{AudioCapture, CpalInput, InputDevice};
pub use playback::{AudioSink, CpalSink, PlaybackController, PlaybackHandle, decode_mp3};

use crate::{Error, Result};

/// An immutable fragment of captured audio
///
/// Chunks are appended to the session buffer in capture order and never
/// mutated or reordered.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    samples: Vec<f32>,
}

impl AudioChunk {
    /// Wrap raw f32 samples
    #[must_use]
    pub const fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// The samples in this chunk
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples in this chunk
    #[must_use]
    pub const fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the chunk holds no samples
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Ordered, append-only sequence of chunks for one recording session
///
/// Owned by `AudioCapture` for the session's duration and reset when a new
/// session is armed. Snapshots are non-destructive so partial transcription
/// can sample the buffer while capture continues.
#[derive(Debug, Default)]
pub struct AudioBuffer {
    chunks: Vec<AudioChunk>,
}

impl AudioBuffer {
    /// Create an empty buffer
    #[must_use]
    pub const fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Append a chunk of captured audio
    pub fn push(&mut self, chunk: AudioChunk) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Copy out all samples captured so far, leaving the buffer intact
    #[must_use]
    pub fn snapshot(&self) -> Vec<f32> {
        let mut samples = Vec::with_capacity(self.sample_count());
        for chunk in &self.chunks {
            samples.extend_from_slice(chunk.samples());
        }
        samples
    }

    /// Discard all chunks
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Number of chunks appended so far
    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total number of samples across all chunks
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.chunks.iter().map(AudioChunk::len).sum()
    }

    /// Whether no audio has been captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(AudioChunk::is_empty)
    }
}

/// Convert f32 samples to WAV bytes for the STT API
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
