//! Game API module.
//!
//! Wire types, the REST client and the browser impersonation used when
//! talking to the mini-app backend.

pub mod agents;
mod api;
mod models;

pub use api::{ApiError, GameApi, HttpGameApi};
pub use models::{
    AD_WATCHED, AdsInfo, CLICKS_SYNCED, CheckType, DAILY_CLAIMED, MessageResponse, QUEST_FINISHED,
    QuestInfo, QuestStatus, UPGRADE_BOUGHT, UpgradeTier, UpgradeTrack, Upgrades, UserQuest,
    UserState,
};
