//! Wire types of the game REST API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `claim-daily` confirmation.
pub const DAILY_CLAIMED: &str = "ok";
/// `quests/finish` confirmation.
pub const QUEST_FINISHED: &str = "Quest marked as finished";
/// `syncClicks` confirmation.
pub const CLICKS_SYNCED: &str = "Bonuses incremented";
/// `ads/watch` confirmation.
pub const AD_WATCHED: &str = "Ad bonus applied!";
/// `upgrades/buy` confirmation.
pub const UPGRADE_BOUGHT: &str = "Your level has been raised!";

/// Snapshot of the player returned by `GET /user`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(deserialize_with = "decimal")]
    pub balance: f64,

    /// Pending daily bonus; only an explicit zero means nothing to claim.
    #[serde(default)]
    pub daily_bonus_available: Option<u32>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub quests: Vec<UserQuest>,

    /// End of the game cooldown, kept raw so a bad value only affects play.
    #[serde(default)]
    pub limit_date: Option<String>,
}

impl UserState {
    /// Balance as whole diamonds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn whole_balance(&self) -> i64 {
        self.balance.trunc() as i64
    }

    #[must_use]
    pub fn daily_bonus_claimable(&self) -> bool {
        self.daily_bonus_available != Some(0)
    }

    /// Parses `limitDate`; null, missing and empty values mean no cooldown.
    pub fn cooldown_until(&self) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
        match self.limit_date.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(raw).map(|date| Some(date.with_timezone(&Utc))),
        }
    }
}

/// Quest progress embedded in the user state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserQuest {
    pub name: String,
    pub status: QuestStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    Pending,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Entry of `GET /quests`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestInfo {
    pub name: String,
    #[serde(default)]
    pub check_type: CheckType,
}

/// How the server verifies a quest. Only timer quests can be finished directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Timer,
    #[default]
    #[serde(other)]
    Other,
}

/// Generic `{message}` reply of the mutating endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            message: Some(message.to_owned()),
        }
    }

    /// Returns true if the server replied with exactly `expected`.
    #[must_use]
    pub fn confirms(&self, expected: &str) -> bool {
        self.message.as_deref() == Some(expected)
    }
}

/// Reply of `GET /ads`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AdsInfo {
    #[serde(default)]
    pub available: u32,
}

/// Purchasable progression stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeTrack {
    TapPower,
    TapDuration,
    TapCoolDown,
}

impl UpgradeTrack {
    /// Identifier used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TapPower => "tapPower",
            Self::TapDuration => "tapDuration",
            Self::TapCoolDown => "tapCoolDown",
        }
    }

    /// Human-readable label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TapPower => "tap power",
            Self::TapDuration => "game duration",
            Self::TapCoolDown => "game cooldown",
        }
    }
}

impl fmt::Display for UpgradeTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tier of an upgrade track.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct UpgradeTier {
    pub level: u32,
    #[serde(deserialize_with = "decimal")]
    pub price: f64,
}

impl UpgradeTier {
    /// Price as whole diamonds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn whole_price(&self) -> i64 {
        self.price.trunc() as i64
    }
}

/// Reply of `GET /upgrades`: `[current, next]` per track.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrades {
    #[serde(default)]
    pub tap_power: Vec<UpgradeTier>,
    #[serde(default)]
    pub tap_duration: Vec<UpgradeTier>,
    #[serde(default)]
    pub tap_cool_down: Vec<UpgradeTier>,
}

impl Upgrades {
    /// Current tier of the given track.
    #[must_use]
    pub fn current(&self, track: UpgradeTrack) -> Option<&UpgradeTier> {
        self.tiers(track).first()
    }

    fn tiers(&self, track: UpgradeTrack) -> &[UpgradeTier] {
        match track {
            UpgradeTrack::TapPower => &self.tap_power,
            UpgradeTrack::TapDuration => &self.tap_duration,
            UpgradeTrack::TapCoolDown => &self.tap_cool_down,
        }
    }
}

/// Accepts decimals sent either as JSON numbers or as strings.
fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decimal {
        Number(f64),
        Text(String),
    }

    match Decimal::deserialize(deserializer)? {
        Decimal::Number(value) => Ok(value),
        Decimal::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_user_state_from_api() {
        let json = r#"{
            "balance": "1523.75",
            "dailyBonusAvailable": 1,
            "quests": [{"name": "follow", "status": "completed"}, {"name": "x", "status": "weird"}],
            "limitDate": "2026-10-17T12:30:00.000Z",
            "tapPower": 3
        }"#;
        let user: UserState = serde_json::from_str(json).unwrap();
        assert_eq!(user.whole_balance(), 1523);
        assert_eq!(user.daily_bonus_available, Some(1));
        assert!(user.daily_bonus_claimable());
        assert_eq!(user.quests[0].status, QuestStatus::Completed);
        assert_eq!(user.quests[1].status, QuestStatus::Unknown);
        assert_eq!(
            user.cooldown_until().unwrap(),
            Some(Utc.with_ymd_and_hms(2026, 10, 17, 12, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_user_state_without_cooldown() {
        let user: UserState =
            serde_json::from_str(r#"{"balance": 10, "quests": null, "limitDate": null}"#).unwrap();
        assert!(user.quests.is_empty());
        assert_eq!(user.cooldown_until().unwrap(), None);

        let empty = UserState {
            limit_date: Some(String::new()),
            ..UserState::default()
        };
        assert_eq!(empty.cooldown_until().unwrap(), None);
    }

    #[test]
    fn test_daily_bonus_null_or_missing_is_claimable() {
        let null: UserState =
            serde_json::from_str(r#"{"balance": 1, "dailyBonusAvailable": null}"#).unwrap();
        assert_eq!(null.daily_bonus_available, None);
        assert!(null.daily_bonus_claimable());

        let missing: UserState = serde_json::from_str(r#"{"balance": 1}"#).unwrap();
        assert!(missing.daily_bonus_claimable());

        let zero: UserState =
            serde_json::from_str(r#"{"balance": 1, "dailyBonusAvailable": 0}"#).unwrap();
        assert!(!zero.daily_bonus_claimable());
    }

    #[test]
    fn test_bad_limit_date() {
        let user = UserState {
            limit_date: Some("tomorrow".to_owned()),
            ..UserState::default()
        };
        assert!(user.cooldown_until().is_err());
    }

    #[test]
    fn test_quest_check_type() {
        let quests: Vec<QuestInfo> = serde_json::from_str(
            r#"[{"name": "a", "checkType": "timer"}, {"name": "b", "checkType": "telegram"}, {"name": "c"}]"#,
        )
        .unwrap();
        let kinds: Vec<_> = quests.iter().map(|q| q.check_type).collect();
        assert_eq!(kinds, vec![CheckType::Timer, CheckType::Other, CheckType::Other]);
    }

    #[test]
    fn test_upgrades_from_api() {
        let json = r#"{
            "tapPower": [{"level": 2, "price": "500"}, {"level": 3, "price": "1000"}],
            "tapDuration": [{"level": 1, "price": 250.5}],
            "tapCoolDown": []
        }"#;
        let upgrades: Upgrades = serde_json::from_str(json).unwrap();
        let power = upgrades.current(UpgradeTrack::TapPower).unwrap();
        assert_eq!(power.level, 2);
        assert_eq!(power.whole_price(), 500);
        assert_eq!(upgrades.current(UpgradeTrack::TapDuration).unwrap().whole_price(), 250);
        assert!(upgrades.current(UpgradeTrack::TapCoolDown).is_none());
    }

    #[test]
    fn test_message_confirmation() {
        let reply: MessageResponse = serde_json::from_str(r#"{"message": "ok"}"#).unwrap();
        assert!(reply.confirms(DAILY_CLAIMED));
        assert!(!reply.confirms(QUEST_FINISHED));

        let empty: MessageResponse = serde_json::from_str("{}").unwrap();
        assert!(!empty.confirms(DAILY_CLAIMED));
    }

    #[test]
    fn test_track_names() {
        assert_eq!(UpgradeTrack::TapCoolDown.as_str(), "tapCoolDown");
        assert_eq!(
            serde_json::to_string(&UpgradeTrack::TapCoolDown).unwrap(),
            "\"tapCoolDown\""
        );
    }
}
