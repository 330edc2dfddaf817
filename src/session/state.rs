//! Account session state tracking.

use std::fmt;
use tracing::debug;

/// Lifecycle of one account task.
///
/// `Disconnected → Handshaking → Authenticated → {Iterating ⇄ Sleeping}`,
/// ending in `InvalidSession` or process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Disconnected,
    Handshaking,
    Authenticated,
    Iterating,
    Sleeping,
    InvalidSession,
}

impl SessionPhase {
    /// Returns true if the transition is part of the lifecycle.
    #[must_use]
    pub const fn can_enter(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Handshaking)
                | (Self::Handshaking, Self::Authenticated | Self::InvalidSession)
                | (Self::Authenticated | Self::Sleeping, Self::Iterating)
                | (Self::Iterating, Self::Sleeping | Self::Iterating | Self::InvalidSession)
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::InvalidSession)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Handshaking => "handshaking",
            Self::Authenticated => "authenticated",
            Self::Iterating => "iterating",
            Self::Sleeping => "sleeping",
            Self::InvalidSession => "invalid session",
        };
        f.write_str(name)
    }
}

/// Loop-local bookkeeping of an account.
#[derive(Debug, Default)]
pub struct SessionState {
    phase: SessionPhase,

    /// Number of iterations started.
    pub iterations: u64,

    /// Balance seen by the most recent successful read.
    pub last_balance: Option<i64>,
}

impl SessionState {
    /// Creates state for a session whose token is already known.
    #[must_use]
    pub fn authenticated() -> Self {
        Self {
            phase: SessionPhase::Authenticated,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Moves to `next`, logging transitions outside the lifecycle.
    pub fn enter(&mut self, next: SessionPhase) {
        if !self.phase.can_enter(next) {
            debug!("Unexpected session transition {} -> {}", self.phase, next);
        }
        if next == SessionPhase::Iterating {
            self.iterations += 1;
        }
        self.phase = next;
    }
}
