//! Live and finalized transcription
//!
//! While the microphone is armed, [`PartialTranscriber`] periodically sends
//! the growing session audio for transcription and publishes provisional
//! text. On disarm, [`FinalTranscriber`] produces the authoritative
//! transcript exactly once.

mod finalize;
mod partial;

pub use finalize::FinalTranscriber;
pub use partial::{PartialTranscriber, PartialUpdate};
