//! Account session loop.
//!
//! Each iteration runs its phases strictly in order, with a short pause
//! between them:
//! 1. Read the user state (visit + user)
//! 2. Claim the daily bonus if one is available
//! 3. Finish timer quests that are not completed yet
//! 4. Play the tap game, or note the remaining cooldown
//! 5. Watch ads to replay the game (ads capability)
//! 6. Buy upgrades up to the configured levels (upgrades capability)
//!
//! The iteration returns how long to sleep. Failures of single actions are
//! logged and skipped; a failed state read restarts the iteration after the
//! error pause. Only a fatal error ends the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use super::plan::{self, PlayWindow, UpgradeStep};
use super::{SessionError, SessionPhase, SessionState};
use crate::config::{GameSettings, UpgradeTarget};
use crate::game::{
    AD_WATCHED, CLICKS_SYNCED, DAILY_CLAIMED, GameApi, QUEST_FINISHED, UPGRADE_BOUGHT, UserState,
};

/// Fixed pauses of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between phases of one iteration.
    pub phase_pause: Duration,

    /// Pause after a failed iteration.
    pub error_pause: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            phase_pause: Duration::from_millis(1500),
            error_pause: Duration::from_secs(3),
        }
    }
}

impl Pacing {
    /// No pauses at all.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            phase_pause: Duration::ZERO,
            error_pause: Duration::ZERO,
        }
    }
}

/// Polling loop of one authenticated account.
pub struct SessionLoop<A> {
    api: A,
    settings: Arc<GameSettings>,
    pacing: Pacing,
    state: SessionState,
    rng: StdRng,
}

impl<A: GameApi> SessionLoop<A> {
    /// Creates a loop over an API client that already carries its token.
    pub fn new(api: A, settings: Arc<GameSettings>) -> Self {
        Self {
            api,
            settings,
            pacing: Pacing::default(),
            state: SessionState::authenticated(),
            rng: StdRng::from_entropy(),
        }
    }

    #[must_use]
    pub const fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs until a fatal error, which is returned.
    pub async fn run(&mut self) -> SessionError {
        loop {
            match self.run_iteration().await {
                Ok(sleep) => {
                    info!("Sleep {:.2} min", sleep.as_secs_f64() / 60.0);
                    self.state.enter(SessionPhase::Sleeping);
                    tokio::time::sleep(sleep).await;
                }
                Err(err) if err.is_fatal() => {
                    self.state.enter(SessionPhase::InvalidSession);
                    return err;
                }
                Err(err) => {
                    error!("Unknown error: {}", err);
                    tokio::time::sleep(self.pacing.error_pause).await;
                }
            }
        }
    }

    /// Runs one iteration and returns the time to sleep before the next.
    pub async fn run_iteration(&mut self) -> Result<Duration, SessionError> {
        self.state.enter(SessionPhase::Iterating);

        let user = self.api.user_state().await.map_err(SessionError::UserState)?;
        self.state.last_balance = Some(user.whole_balance());
        info!("Balance - {}", user.whole_balance());

        self.pause().await;
        self.claim_daily(&user).await;

        self.pause().await;
        self.complete_quests(&user).await;

        self.pause().await;
        let cooldown = self.play(&user).await;

        if self.settings.capabilities.ads {
            self.pause().await;
            self.watch_ads().await;
        }

        let targets: Vec<UpgradeTarget> = self.settings.enabled_upgrades().copied().collect();
        for target in targets {
            self.upgrade_pass(target).await;
        }

        Ok(plan::next_sleep(cooldown, &mut self.rng))
    }

    async fn pause(&self) {
        if !self.pacing.phase_pause.is_zero() {
            tokio::time::sleep(self.pacing.phase_pause).await;
        }
    }

    async fn claim_daily(&self, user: &UserState) {
        if !user.daily_bonus_claimable() {
            info!("Daily bonus not available");
            return;
        }

        match self.api.claim_daily().await {
            Ok(reply) if reply.confirms(DAILY_CLAIMED) => {
                info!("Claimed daily bonus");
            }
            Ok(reply) => warn!("Daily claim not confirmed: {:?}", reply.message),
            Err(e) => error!("Daily claim error happened: {}", e),
        }
    }

    async fn complete_quests(&self, user: &UserState) {
        let timer_quests = match self.api.timer_quests().await {
            Ok(quests) => quests,
            Err(e) => {
                error!("Get quests error happened: {}", e);
                return;
            }
        };

        for name in plan::quests_to_attempt(&timer_quests, &user.quests) {
            match self.api.finish_quest(&name).await {
                Ok(reply) if reply.confirms(QUEST_FINISHED) => {
                    info!("Successfully done {} quest", name);
                }
                Ok(reply) => debug!("Quest {} not confirmed: {:?}", name, reply.message),
                Err(e) => error!("Finish quest {} error happened: {}", name, e),
            }
        }
    }

    /// Plays if the cooldown is over; otherwise returns the time left.
    async fn play(&mut self, user: &UserState) -> Option<Duration> {
        let cooldown_until = match user.cooldown_until() {
            Ok(until) => until,
            Err(e) => {
                warn!("Unreadable limitDate {:?}: {}", user.limit_date, e);
                return None;
            }
        };

        match plan::play_window(cooldown_until, Utc::now()) {
            PlayWindow::Open => {
                self.play_game().await;
                None
            }
            PlayWindow::Cooldown(remaining) => {
                info!("Game on cooldown, {}s left", remaining.as_secs());
                Some(remaining)
            }
        }
    }

    async fn play_game(&mut self) {
        let clicks = plan::random_clicks(self.settings.clicks, &mut self.rng);

        match self.api.sync_clicks(clicks).await {
            Ok(reply) if reply.confirms(CLICKS_SYNCED) => {
                match self.refresh_balance().await {
                    Some(balance) => info!("Played game, got - {} diamonds, balance - {}", clicks, balance),
                    None => info!("Played game, got - {} diamonds", clicks),
                }
            }
            Ok(reply) => warn!("Game result not confirmed: {:?}", reply.message),
            Err(e) => error!("Sync clicks error happened: {}", e),
        }
    }

    async fn watch_ads(&mut self) {
        let mut available = match self.api.ads().await {
            Ok(ads) => ads.available,
            Err(e) => {
                error!("Get ads limit error happened: {}", e);
                return;
            }
        };

        while available > 0 {
            match self.api.watch_ad().await {
                Ok(reply) if reply.confirms(AD_WATCHED) => {
                    info!("Watched ad to skip game cooldown");
                    self.play_game().await;
                }
                Ok(reply) => warn!("Ad not confirmed: {:?}", reply.message),
                Err(e) => error!("Watch ads error happened: {}", e),
            }
            available -= 1;
        }
    }

    async fn upgrade_pass(&mut self, target: UpgradeTarget) {
        let label = target.track.label();

        loop {
            let upgrades = match self.api.upgrades().await {
                Ok(upgrades) => upgrades,
                Err(e) => {
                    error!("Get upgrades error happened: {}", e);
                    return;
                }
            };
            let Some(current) = upgrades.current(target.track).copied() else {
                warn!("No {} tier in upgrades reply", target.track);
                return;
            };
            let Some(balance) = self.refresh_balance().await else {
                return;
            };

            match plan::upgrade_step(&current, balance, target.level) {
                UpgradeStep::TargetReached => {
                    debug!("{} is at level {} (target {})", label, current.level, target.level);
                    return;
                }
                UpgradeStep::Insufficient { price } => {
                    info!("Not enough money to upgrade {} ({} < {})", label, balance, price);
                    return;
                }
                UpgradeStep::Buy { price } => match self.api.buy_upgrade(target.track).await {
                    Ok(reply) if reply.confirms(UPGRADE_BOUGHT) => {
                        info!(
                            "Successfully upgraded {}, level - {}, balance - {}",
                            label,
                            current.level + 1,
                            balance - price
                        );
                    }
                    Ok(reply) => {
                        error!("Something wrong in upgrade: {:?}", reply.message);
                        return;
                    }
                    Err(e) => {
                        error!("Do upgrade error happened: {}", e);
                        return;
                    }
                },
            }
        }
    }

    async fn refresh_balance(&mut self) -> Option<i64> {
        match self.api.user_state().await {
            Ok(user) => {
                let balance = user.whole_balance();
                self.state.last_balance = Some(balance);
                Some(balance)
            }
            Err(e) => {
                error!("Balance request error happened: {}", e);
                None
            }
        }
    }
}

impl<A> std::fmt::Debug for SessionLoop<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLoop")
            .field("pacing", &self.pacing)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
