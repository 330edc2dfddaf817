//! Outcome classification for session phases.

use thiserror::Error;

use crate::game::ApiError;
use crate::telegram::{TelegramError, WebAppError};

/// Error returned by a session phase. The loop dispatches on [`is_fatal`].
///
/// [`is_fatal`]: SessionError::is_fatal
#[derive(Debug, Error)]
pub enum SessionError {
    /// The Telegram session is revoked, deactivated or logged out.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),

    #[error("Web app error: {0}")]
    WebApp(#[from] WebAppError),

    #[error("Game API error: {0}")]
    Api(#[from] ApiError),

    #[error("Failed to read user state: {0}")]
    UserState(#[source] ApiError),
}

impl SessionError {
    /// Fatal errors end the account task; everything else is retried.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidSession(_))
    }
}
