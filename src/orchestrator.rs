//! Turn orchestration
//!
//! Sequences "user finished speaking/typing" through chat completion,
//! optional speech synthesis, and playback. One turn cycle runs at a time;
//! every failure path lands back in `Idle` so a collaborator outage never
//! wedges the client.

use std::sync::Arc;

use crate::audio::PlaybackController;
use crate::conversation::{ConversationLog, Speaker};
use crate::services::{ChatBackend, SpeechSynthesizer};
use crate::Result;

/// Position in the turn cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No request in flight
    Idle,
    /// Chat round-trip outstanding
    AwaitingReply,
    /// Synthesis outstanding for a voice-originated reply
    AwaitingSpeech,
}

/// Ephemeral state for the turn currently being produced
///
/// Created when input begins, dropped once the reply (and optional
/// playback) completes.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext {
    /// Whether the turn's text came from finalized speech rather than
    /// typed input; decides whether the reply is spoken
    pub voice_origin: bool,
}

impl TurnContext {
    /// Context for a typed submission
    #[must_use]
    pub const fn typed() -> Self {
        Self {
            voice_origin: false,
        }
    }

    /// Context for a finalized voice transcript
    #[must_use]
    pub const fn voice() -> Self {
        Self { voice_origin: true }
    }
}

/// How a turn cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Assistant reply appended; `spoke` when playback was started
    Completed {
        /// Whether the reply was synthesized and handed to playback
        spoke: bool,
    },
    /// A turn was already in flight; nothing was changed
    Rejected,
}

/// Drives the chat/synthesis/playback cycle for one turn at a time
pub struct TurnOrchestrator {
    chat: Arc<dyn ChatBackend>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: PlaybackController,
    speak_replies: bool,
    state: TurnState,
}

impl TurnOrchestrator {
    /// Create an orchestrator over the given collaborators
    #[must_use]
    pub const fn new(
        chat: Arc<dyn ChatBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        playback: PlaybackController,
        speak_replies: bool,
    ) -> Self {
        Self {
            chat,
            synthesizer,
            playback,
            speak_replies,
            state: TurnState::Idle,
        }
    }

    /// Current position in the turn cycle
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    /// Whether a new submit would be accepted
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, TurnState::Idle)
    }

    /// Run one full turn cycle
    ///
    /// Appends the user turn (replacing any live transcript), requests the
    /// chat reply, and for voice-originated turns synthesizes and plays the
    /// reply. Always returns with the state back at `Idle`.
    ///
    /// # Errors
    ///
    /// Returns the collaborator error when chat, synthesis, or playback
    /// fails. The log keeps every turn appended before the failure; the
    /// caller may surface the error as a non-fatal notification.
    pub async fn run_turn(
        &mut self,
        text: &str,
        ctx: TurnContext,
        log: &mut ConversationLog,
    ) -> Result<TurnOutcome> {
        if !self.is_idle() {
            tracing::warn!(state = ?self.state, "submit rejected, turn already in flight");
            return Ok(TurnOutcome::Rejected);
        }

        if ctx.voice_origin {
            log.commit_partial(text);
        } else {
            log.append_final(Speaker::User, text);
        }

        self.state = TurnState::AwaitingReply;
        tracing::debug!(voice_origin = ctx.voice_origin, "requesting chat reply");

        let reply = match self.chat.send(text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "chat request failed");
                self.state = TurnState::Idle;
                return Err(e);
            }
        };

        log.append_final(Speaker::Assistant, &reply);

        if !ctx.voice_origin || !self.speak_replies {
            self.state = TurnState::Idle;
            return Ok(TurnOutcome::Completed { spoke: false });
        }

        self.state = TurnState::AwaitingSpeech;
        tracing::debug!("requesting speech synthesis");

        let audio = match self.synthesizer.synthesize(&reply).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(error = %e, "speech synthesis failed");
                self.state = TurnState::Idle;
                return Err(e);
            }
        };

        if let Err(e) = self.playback.play_mp3(&audio) {
            tracing::error!(error = %e, "playback failed");
            self.state = TurnState::Idle;
            return Err(e);
        }

        self.state = TurnState::Idle;
        Ok(TurnOutcome::Completed { spoke: true })
    }

    /// Halt any active playback
    pub fn stop_playback(&mut self) {
        self.playback.stop();
    }

    /// Whether reply audio is currently playing
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.playback.is_active()
    }

    #[cfg(test)]
    pub(crate) const fn force_state(&mut self, state: TurnState) {
        self.state = state;
    }
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("state", &self.state)
            .field("speak_replies", &self.speak_replies)
            .finish_non_exhaustive()
    }
}
