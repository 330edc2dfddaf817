//! Application settings and Telegram configuration.

use std::path::{Path, PathBuf};

use crate::game::UpgradeTrack;
use crate::telegram::TokenFormat;

/// Start parameter used when `REF_ID` is not configured.
pub const DEFAULT_REF_ID: &str = "737844465";

/// Telegram API configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Directory holding one `<name>.session` file per account.
    pub sessions_dir: PathBuf,
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("sessions")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String) -> Self {
        Self {
            api_id,
            api_hash,
            sessions_dir: default_sessions_dir(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `API_ID` and `API_HASH` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Creates configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_id: i32 = lookup("API_ID")
            .ok_or(ConfigError::MissingEnvVar("API_ID"))?
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = lookup("API_HASH").ok_or(ConfigError::MissingEnvVar("API_HASH"))?;

        let sessions_dir = lookup("SESSIONS_DIR").map_or_else(default_sessions_dir, PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            sessions_dir,
        })
    }

    /// Returns the session file path for the given account name.
    #[must_use]
    pub fn session_path(&self, name: &str) -> PathBuf {
        self.sessions_dir.join(format!("{name}.session"))
    }
}

/// Inclusive range for the randomized tap bonus submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickRange {
    pub min: u32,
    pub max: u32,
}

impl Default for ClickRange {
    fn default() -> Self {
        Self { min: 300, max: 1000 }
    }
}

impl ClickRange {
    /// Parses `[min,max]` or `min,max`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let values: Vec<u32> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed).map_err(|_| ConfigError::InvalidClicks(raw.to_owned()))?
        } else {
            trimmed
                .split(',')
                .map(|part| part.trim().parse())
                .collect::<Result<_, _>>()
                .map_err(|_| ConfigError::InvalidClicks(raw.to_owned()))?
        };

        match values.as_slice() {
            [min, max] if min <= max => Ok(Self {
                min: *min,
                max: *max,
            }),
            _ => Err(ConfigError::InvalidClicks(raw.to_owned())),
        }
    }
}

/// Optional game features. Deployments without ads or upgrades turn them off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub ads: bool,
    pub upgrades: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            ads: true,
            upgrades: true,
        }
    }
}

/// Auto-upgrade configuration for a single track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeTarget {
    pub track: UpgradeTrack,
    pub enabled: bool,
    pub level: u32,
}

/// Game automation settings.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Base URL of the game REST API.
    pub api_base_url: String,

    /// Bot that hosts the web app.
    pub bot_username: String,

    /// Short name of the web app inside the bot.
    pub app_short_name: String,

    /// Referral start parameter passed to the web app.
    pub ref_id: String,

    /// How the web-app payload becomes the API token.
    pub token_format: TokenFormat,

    pub capabilities: Capabilities,

    pub clicks: ClickRange,

    /// Upgrade passes in execution order.
    pub upgrades: Vec<UpgradeTarget>,

    pub use_proxy_from_file: bool,

    pub proxy_file: PathBuf,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.diamore.co".to_owned(),
            bot_username: "DiamoreCryptoBot".to_owned(),
            app_short_name: "app".to_owned(),
            ref_id: DEFAULT_REF_ID.to_owned(),
            token_format: TokenFormat::Raw,
            capabilities: Capabilities::default(),
            clicks: ClickRange::default(),
            upgrades: vec![
                UpgradeTarget {
                    track: UpgradeTrack::TapCoolDown,
                    enabled: true,
                    level: 20,
                },
                UpgradeTarget {
                    track: UpgradeTrack::TapPower,
                    enabled: false,
                    level: 20,
                },
                UpgradeTarget {
                    track: UpgradeTrack::TapDuration,
                    enabled: false,
                    level: 20,
                },
            ],
            use_proxy_from_file: false,
            proxy_file: PathBuf::from("proxies.txt"),
        }
    }
}

impl GameSettings {
    /// Creates game settings from environment variables with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Creates game settings from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let clicks = match lookup("CLICKS") {
            Some(raw) => ClickRange::parse(&raw)?,
            None => defaults.clicks,
        };

        let token_format = match lookup("TOKEN_FORMAT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TOKEN_FORMAT", raw))?,
            None => defaults.token_format,
        };

        let capabilities = Capabilities {
            ads: parse_flag(&lookup, "GAME_ADS", defaults.capabilities.ads)?,
            upgrades: parse_flag(&lookup, "GAME_UPGRADES", defaults.capabilities.upgrades)?,
        };

        let upgrades = [
            (
                UpgradeTrack::TapCoolDown,
                "AUTO_UPGRADE_REDUCE_COOLDOWN",
                "AUTO_UPGRADE_REDUCE_COOLDOWN_LEVEL",
                true,
            ),
            (
                UpgradeTrack::TapPower,
                "AUTO_UPGRADE_CLICKING_POWER",
                "AUTO_UPGRADE_CLICKING_POWER_LEVEL",
                false,
            ),
            (
                UpgradeTrack::TapDuration,
                "AUTO_UPGRADE_TIMER",
                "AUTO_UPGRADE_TIMER_LEVEL",
                false,
            ),
        ]
        .into_iter()
        .map(|(track, flag_key, level_key, enabled_default)| {
            Ok(UpgradeTarget {
                track,
                enabled: parse_flag(&lookup, flag_key, enabled_default)?,
                level: parse_number(&lookup, level_key, 20)?,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            api_base_url: lookup("API_BASE_URL")
                .map_or(defaults.api_base_url, |url| url.trim_end_matches('/').to_owned()),
            bot_username: lookup("BOT_USERNAME").unwrap_or(defaults.bot_username),
            app_short_name: lookup("APP_SHORT_NAME").unwrap_or(defaults.app_short_name),
            ref_id: lookup("REF_ID").unwrap_or(defaults.ref_id),
            token_format,
            capabilities,
            clicks,
            upgrades,
            use_proxy_from_file: parse_flag(&lookup, "USE_PROXY_FROM_FILE", false)?,
            proxy_file: lookup("PROXY_FILE").map_or(defaults.proxy_file, PathBuf::from),
        })
    }

    /// Upgrade passes that should run, honoring the upgrades capability.
    pub fn enabled_upgrades(&self) -> impl Iterator<Item = &UpgradeTarget> {
        self.upgrades
            .iter()
            .filter(|target| self.capabilities.upgrades && target.enabled)
    }

    /// Path of the proxy list, if proxies are enabled.
    #[must_use]
    pub fn proxy_path(&self) -> Option<&Path> {
        self.use_proxy_from_file.then_some(self.proxy_file.as_path())
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key, raw)),
    }
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw))
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("Invalid CLICKS value {0:?} (expected [min,max] with min <= max)")]
    InvalidClicks(String),

    #[error("Invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
}
