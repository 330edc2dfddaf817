//! Telegram client wrapper module.
//!
//! Provides the account session used to sign in and to launch the game
//! web app, plus the helpers that turn a launch URL into an API token.

mod client;
mod web_app;

pub use client::{PwdToken as PasswordToken, TelegramAccount, TelegramError, Token as LoginToken};
pub use web_app::{
    BotPeer, TokenFormat, WebAppError, WebAppLauncher, WebAppTarget, auth_token_from_url,
    build_auth_token, extract_web_app_data,
};
