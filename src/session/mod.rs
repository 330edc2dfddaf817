//! Per-account session module.
//!
//! Obtains the web-app token for an account and then drives the game loop
//! until the Telegram session becomes invalid.

mod account;
mod error;
mod handshake;
pub mod plan;
mod runner;
mod state;

pub use account::{Account, SESSION_EXTENSION, assign_proxies, discover_sessions, run_account};
pub use error::SessionError;
pub use handshake::{
    FLOOD_WAIT_MARGIN, HANDSHAKE_RETRY_PAUSE, fetch_auth_token, flood_backoff, retry_transient,
};
pub use runner::{Pacing, SessionLoop};
pub use state::{SessionPhase, SessionState};
