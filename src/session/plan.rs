//! Pure decisions taken by the session loop.
//!
//! Everything here is free of I/O: time and randomness are passed in so the
//! loop's choices can be checked directly.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::ClickRange;
use crate::game::{QuestStatus, UpgradeTier, UserQuest};

/// Longest cooldown the loop waits out exactly.
pub const MAX_EXACT_SLEEP: Duration = Duration::from_secs(3600);

/// Bounds of the default sleep window, in seconds.
pub const DEFAULT_SLEEP_SECS: std::ops::RangeInclusive<u64> = 3500..=3600;

/// Whether the tap game can be played right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayWindow {
    Open,
    Cooldown(Duration),
}

/// Compares the cooldown end with `now`. No cooldown means the game is open.
pub fn play_window(cooldown_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> PlayWindow {
    match cooldown_until {
        Some(until) if now <= until => {
            PlayWindow::Cooldown((until - now).to_std().unwrap_or_default())
        }
        _ => PlayWindow::Open,
    }
}

/// Timer quests that are not yet completed, in server order.
pub fn quests_to_attempt(timer_quests: &[String], progress: &[UserQuest]) -> Vec<String> {
    let completed: HashSet<&str> = progress
        .iter()
        .filter(|quest| quest.status == QuestStatus::Completed)
        .map(|quest| quest.name.as_str())
        .collect();

    timer_quests
        .iter()
        .filter(|name| !completed.contains(name.as_str()))
        .cloned()
        .collect()
}

/// Draws a tap bonus count from the inclusive range.
pub fn random_clicks<R: Rng + ?Sized>(range: ClickRange, rng: &mut R) -> u32 {
    rng.gen_range(range.min..=range.max)
}

/// Time until the next iteration.
///
/// A known cooldown up to an hour is slept exactly; otherwise the loop waits
/// a random 3500..=3600 seconds.
pub fn next_sleep<R: Rng + ?Sized>(cooldown: Option<Duration>, rng: &mut R) -> Duration {
    match cooldown {
        Some(remaining) if remaining <= MAX_EXACT_SLEEP => Duration::from_secs(remaining.as_secs()),
        _ => Duration::from_secs(rng.gen_range(DEFAULT_SLEEP_SECS)),
    }
}

/// What an upgrade pass does with the current tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeStep {
    TargetReached,
    Buy { price: i64 },
    Insufficient { price: i64 },
}

pub fn upgrade_step(current: &UpgradeTier, balance: i64, target_level: u32) -> UpgradeStep {
    let price = current.whole_price();
    if current.level >= target_level {
        UpgradeStep::TargetReached
    } else if balance >= price {
        UpgradeStep::Buy { price }
    } else {
        UpgradeStep::Insufficient { price }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn quest(name: &str, status: QuestStatus) -> UserQuest {
        UserQuest {
            name: name.to_owned(),
            status,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_play_window_without_cooldown() {
        assert_eq!(play_window(None, Utc::now()), PlayWindow::Open);
    }

    #[test]
    fn test_play_window_past_cooldown() {
        let now = Utc::now();
        assert_eq!(
            play_window(Some(now - TimeDelta::seconds(1)), now),
            PlayWindow::Open
        );
    }

    #[test]
    fn test_play_window_future_cooldown() {
        let now = Utc::now();
        assert_eq!(
            play_window(Some(now + TimeDelta::minutes(10)), now),
            PlayWindow::Cooldown(Duration::from_secs(600))
        );
    }

    #[test]
    fn test_play_window_boundary_is_cooldown() {
        let now = Utc::now();
        assert_eq!(play_window(Some(now), now), PlayWindow::Cooldown(Duration::ZERO));
    }

    #[test]
    fn test_quests_all_when_none_completed() {
        let timer = names(&["a", "b"]);
        assert_eq!(quests_to_attempt(&timer, &[]), timer);
    }

    #[test]
    fn test_quests_skip_completed() {
        let timer = names(&["a", "b", "c"]);
        let progress = vec![
            quest("b", QuestStatus::Completed),
            quest("c", QuestStatus::Pending),
            quest("z", QuestStatus::Completed),
        ];
        assert_eq!(quests_to_attempt(&timer, &progress), names(&["a", "c"]));
    }

    #[test]
    fn test_random_clicks_within_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let range = ClickRange { min: 300, max: 310 };
        for _ in 0..500 {
            let clicks = random_clicks(range, &mut rng);
            assert!((300..=310).contains(&clicks));
        }
        assert_eq!(random_clicks(ClickRange { min: 5, max: 5 }, &mut rng), 5);
    }

    #[test]
    fn test_next_sleep_exact_cooldown() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(
            next_sleep(Some(Duration::from_millis(600_900)), &mut rng),
            Duration::from_secs(600)
        );
        assert_eq!(
            next_sleep(Some(MAX_EXACT_SLEEP), &mut rng),
            MAX_EXACT_SLEEP
        );
    }

    #[test]
    fn test_next_sleep_default_window() {
        let mut rng = StdRng::seed_from_u64(3);
        for cooldown in [None, Some(Duration::from_secs(3601)), Some(Duration::from_secs(86_400))] {
            let slept = next_sleep(cooldown, &mut rng).as_secs();
            assert!(DEFAULT_SLEEP_SECS.contains(&slept));
        }
    }

    #[test]
    fn test_upgrade_step() {
        let tier = UpgradeTier {
            level: 3,
            price: 100.9,
        };
        assert_eq!(upgrade_step(&tier, 500, 3), UpgradeStep::TargetReached);
        assert_eq!(upgrade_step(&tier, 100, 10), UpgradeStep::Buy { price: 100 });
        assert_eq!(upgrade_step(&tier, 99, 10), UpgradeStep::Insufficient { price: 100 });
    }
}
