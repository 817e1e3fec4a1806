//! Recording session tokens
//!
//! Partial transcription results carry the token of the session that
//! spawned them. A result is applied only while its token matches the live
//! session, so a partial that arrives after the session closed (or after
//! its final transcript was committed) is discarded instead of reappearing
//! in the log.

/// Token identifying one recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken(u64);

/// Issues session tokens and tracks which one is live
#[derive(Debug, Default)]
pub struct SessionGate {
    counter: u64,
    open: bool,
}

impl SessionGate {
    /// Create a gate with no live session
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: 0,
            open: false,
        }
    }

    /// Open a new session, invalidating all earlier tokens
    pub const fn begin(&mut self) -> SessionToken {
        self.counter += 1;
        self.open = true;
        SessionToken(self.counter)
    }

    /// Close the live session
    ///
    /// Results holding its token are stale from this point on.
    pub const fn close(&mut self) {
        self.open = false;
    }

    /// Whether `token` belongs to the currently live session
    #[must_use]
    pub const fn is_live(&self, token: SessionToken) -> bool {
        self.open && token.0 == self.counter
    }
}
