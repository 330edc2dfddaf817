//! Web-app token handshake.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use super::SessionError;
use crate::telegram::{TelegramError, TokenFormat, WebAppLauncher, WebAppTarget, auth_token_from_url};

/// Margin added to the server's flood wait before retrying.
pub const FLOOD_WAIT_MARGIN: Duration = Duration::from_secs(3);

/// Pause before restarting a step that failed for a non-fatal reason.
pub const HANDSHAKE_RETRY_PAUSE: Duration = Duration::from_secs(3);

/// Wait applied after a FLOOD_WAIT of `seconds`.
#[must_use]
pub fn flood_backoff(seconds: u32) -> Duration {
    Duration::from_secs(u64::from(seconds)) + FLOOD_WAIT_MARGIN
}

/// Obtains the API token for the web app.
///
/// Flood waits while resolving the bot are slept out and retried; other
/// transient failures restart the handshake after a short pause. Only a dead
/// session ends it.
pub async fn fetch_auth_token<L>(
    launcher: &L,
    target: &WebAppTarget,
    format: TokenFormat,
) -> Result<String, SessionError>
where
    L: WebAppLauncher + ?Sized,
{
    retry_transient("authorization", || try_handshake(launcher, target, format)).await
}

/// Repeats `attempt` until it succeeds or fails fatally, pausing
/// [`HANDSHAKE_RETRY_PAUSE`] after every other failure.
pub async fn retry_transient<T, F, Fut>(what: &str, mut attempt: F) -> Result<T, SessionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
{
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                error!("Unknown error during {}: {}", what, err);
                tokio::time::sleep(HANDSHAKE_RETRY_PAUSE).await;
            }
        }
    }
}

async fn try_handshake<L>(
    launcher: &L,
    target: &WebAppTarget,
    format: TokenFormat,
) -> Result<String, SessionError>
where
    L: WebAppLauncher + ?Sized,
{
    if !launcher.is_authorized().await.map_err(into_session_error)? {
        return Err(SessionError::InvalidSession("session is not logged in".to_owned()));
    }

    let bot = loop {
        match launcher.resolve_bot(&target.bot_username).await {
            Ok(bot) => break bot,
            Err(TelegramError::FloodWait(seconds)) => {
                warn!("FloodWait {}s while resolving {}", seconds, target.bot_username);
                let backoff = flood_backoff(seconds);
                info!("Sleep {}s", backoff.as_secs());
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(into_session_error(err)),
        }
    };

    let url = launcher
        .request_app_url(&bot, target)
        .await
        .map_err(into_session_error)?;

    Ok(auth_token_from_url(&url, format)?)
}

fn into_session_error(err: TelegramError) -> SessionError {
    if err.is_unauthorized() {
        SessionError::InvalidSession(err.to_string())
    } else {
        SessionError::Telegram(err)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::telegram::BotPeer;

    const URL: &str = "https://app.example.test/#tgWebAppData=query_id%3D1%26hash%3Dh&tgWebAppVersion=7";

    struct FakeLauncher {
        authorized: bool,
        resolves: Mutex<VecDeque<Result<BotPeer, TelegramError>>>,
        urls: Mutex<VecDeque<Result<String, TelegramError>>>,
        resolve_calls: Mutex<u32>,
    }

    impl FakeLauncher {
        fn new(
            resolves: Vec<Result<BotPeer, TelegramError>>,
            urls: Vec<Result<String, TelegramError>>,
        ) -> Self {
            Self {
                authorized: true,
                resolves: Mutex::new(resolves.into()),
                urls: Mutex::new(urls.into()),
                resolve_calls: Mutex::new(0),
            }
        }

        fn bot() -> BotPeer {
            BotPeer {
                user_id: 1,
                access_hash: 2,
            }
        }
    }

    #[async_trait]
    impl WebAppLauncher for FakeLauncher {
        async fn is_authorized(&self) -> Result<bool, TelegramError> {
            Ok(self.authorized)
        }

        async fn resolve_bot(&self, _username: &str) -> Result<BotPeer, TelegramError> {
            *self.resolve_calls.lock().unwrap() += 1;
            self.resolves
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Self::bot()))
        }

        async fn request_app_url(
            &self,
            _bot: &BotPeer,
            _target: &WebAppTarget,
        ) -> Result<String, TelegramError> {
            self.urls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(URL.to_owned()))
        }
    }

    fn target() -> WebAppTarget {
        WebAppTarget::android("DiamoreCryptoBot", "app", "737844465")
    }

    #[tokio::test]
    async fn test_handshake_returns_token() {
        let launcher = FakeLauncher::new(vec![], vec![]);
        let token = fetch_auth_token(&launcher, &target(), TokenFormat::Raw)
            .await
            .unwrap();
        assert_eq!(token, "query_id=1&hash=h");
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_wait_sleeps_with_margin() {
        let launcher = FakeLauncher::new(
            vec![Err(TelegramError::FloodWait(5)), Err(TelegramError::FloodWait(5))],
            vec![],
        );

        let started = tokio::time::Instant::now();
        let token = fetch_auth_token(&launcher, &target(), TokenFormat::Raw).await;

        assert!(token.is_ok());
        assert_eq!(*launcher.resolve_calls.lock().unwrap(), 3);
        assert!(started.elapsed() >= Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_revoked_session_is_fatal() {
        let launcher = FakeLauncher::new(
            vec![Err(TelegramError::Unauthorized("SESSION_REVOKED".to_owned()))],
            vec![],
        );
        let err = fetch_auth_token(&launcher, &target(), TokenFormat::Raw)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidSession(_)));
    }

    #[tokio::test]
    async fn test_logged_out_session_is_fatal() {
        let mut launcher = FakeLauncher::new(vec![], vec![]);
        launcher.authorized = false;
        let err = fetch_auth_token(&launcher, &target(), TokenFormat::Raw)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(*launcher.resolve_calls.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_restarts_handshake() {
        let launcher = FakeLauncher::new(
            vec![],
            vec![
                Err(TelegramError::Invocation("timeout".to_owned())),
                Ok("https://app.example.test/#nothing=1".to_owned()),
            ],
        );

        let started = tokio::time::Instant::now();
        let token = fetch_auth_token(&launcher, &target(), TokenFormat::Raw)
            .await
            .unwrap();

        assert_eq!(token, "query_id=1&hash=h");
        assert_eq!(*launcher.resolve_calls.lock().unwrap(), 3);
        assert!(started.elapsed() >= HANDSHAKE_RETRY_PAUSE * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_transient_until_success() {
        let attempts = Mutex::new(0);

        let started = tokio::time::Instant::now();
        let value = retry_transient("setup", || async {
            let mut attempts = attempts.lock().unwrap();
            *attempts += 1;
            if *attempts == 1 {
                Err(SessionError::Telegram(TelegramError::Session(
                    "database is locked".to_owned(),
                )))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(*attempts.lock().unwrap(), 2);
        assert!(started.elapsed() >= HANDSHAKE_RETRY_PAUSE);
    }

    #[tokio::test]
    async fn test_retry_transient_stops_on_invalid_session() {
        let attempts = Mutex::new(0);

        let err = retry_transient("setup", || async {
            *attempts.lock().unwrap() += 1;
            Err::<(), _>(SessionError::InvalidSession("revoked".to_owned()))
        })
        .await
        .unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(*attempts.lock().unwrap(), 1);
    }

    #[test]
    fn test_flood_backoff() {
        assert_eq!(flood_backoff(5), Duration::from_secs(8));
    }
}
