//! Configuration module for the tapper.
//!
//! Handles loading of Telegram API credentials, game automation settings
//! and the optional upstream proxy list.

mod proxies;
mod settings;

pub use proxies::{load_proxies, parse_proxies, ProxyEntry, ProxyError};
pub use settings::{
    Capabilities, ClickRange, ConfigError, GameSettings, TelegramConfig, UpgradeTarget,
    DEFAULT_REF_ID,
};
