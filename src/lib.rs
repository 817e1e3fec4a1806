//! Parley - voice and text chat client for a local assistant backend
//!
//! This library provides the core functionality of the client:
//! - Microphone capture with press-to-toggle recording sessions
//! - Live partial transcripts while recording, finalized on stop
//! - Turn orchestration (chat round-trip, optional spoken replies)
//! - Speaker playback of synthesized replies
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Frontend (REPL)                     │
//! │        commands ▼                 events ▲           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Parley Client                       │
//! │  Capture │ Transcripts │ Orchestrator │ Playback    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP
//! ┌────────────────────▼────────────────────────────────┐
//! │               Assistant Backend                      │
//! │      /stt       │      /chat      │      /tts       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod services;
pub mod session;
pub mod transcript;

pub use client::{Client, Command};
pub use config::Config;
pub use conversation::{ConversationLog, Speaker, Turn};
pub use error::{Error, Result};
pub use events::{ClientEvent, EventBus};
pub use orchestrator::{TurnContext, TurnOrchestrator, TurnOutcome};
