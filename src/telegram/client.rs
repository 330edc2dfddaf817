//! Telegram client wrapper for a single account session.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::{Client, InvocationError, SenderPool, SignInError, sender};
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::web_app::{BotPeer, WebAppLauncher, WebAppTarget};
use crate::config::{ProxyEntry, TelegramConfig};

/// Re-export types for external use.
pub use grammers_client::client::{LoginToken as Token, PasswordToken as PwdToken};

/// RPC error names that mean the session can no longer be used.
const DEAD_SESSION_ERRORS: &[&str] = &[
    "AUTH_KEY_UNREGISTERED",
    "AUTH_KEY_INVALID",
    "USER_DEACTIVATED",
    "USER_DEACTIVATED_BAN",
    "SESSION_REVOKED",
    "SESSION_EXPIRED",
];

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Session is no longer valid: {0}")]
    Unauthorized(String),

    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Password required for 2FA")]
    PasswordRequired(PasswordToken),

    #[error("Invalid password")]
    InvalidPassword(PasswordToken),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl TelegramError {
    /// Returns true if the account cannot be used without signing in again.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        if let InvocationError::Rpc(rpc) = &err {
            return classify_rpc_error(rpc.code, &rpc.name, rpc.value, err.to_string());
        }

        let err_str = err.to_string();

        // Check for flood wait errors
        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

/// Maps an RPC error onto the variants the session loop reacts to.
fn classify_rpc_error(code: i32, name: &str, value: Option<u32>, message: String) -> TelegramError {
    if (name.starts_with("FLOOD_WAIT") || name.starts_with("FLOOD_PREMIUM_WAIT"))
        && let Some(seconds) = value.or_else(|| extract_flood_wait_seconds(&message))
    {
        return TelegramError::FloodWait(seconds);
    }

    if code == 401 || DEAD_SESSION_ERRORS.contains(&name) {
        return TelegramError::Unauthorized(message);
    }

    if name == "USERNAME_NOT_OCCUPIED" || name == "USERNAME_INVALID" {
        return TelegramError::PeerNotFound(message);
    }

    TelegramError::Invocation(message)
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["flood_wait_", "flood wait ", "(value: "];
    let lowered = err_msg.to_lowercase();

    for pattern in patterns {
        if let Some(idx) = lowered.find(pattern) {
            let num_str: String = lowered[idx + pattern.len()..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Telegram session of one account.
pub struct TelegramAccount {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramAccount {
    /// Connects to Telegram using the given session file, through a SOCKS5
    /// proxy when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened.
    pub async fn connect(
        config: &TelegramConfig,
        session_path: &Path,
        proxy: Option<&ProxyEntry>,
    ) -> Result<Self, TelegramError> {
        debug!("Opening session {}", session_path.display());

        let session = Arc::new(
            SqliteSession::open(session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates: _updates,
            handle,
        } = SenderPool::with_configuration(
            Arc::clone(&session),
            config.api_id,
            connection_params(proxy),
        );

        let client = Client::new(handle.clone());

        // Spawn the sender pool runner
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(Self {
            client,
            handle: handle.thin,
            _pool_task: pool_task,
        })
    }

    /// Requests a login code to be sent to the phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn request_login_code(
        &self,
        phone: &str,
        api_hash: &str,
    ) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Signs in with the login code.
    ///
    /// # Errors
    ///
    /// Returns an error if sign in fails.
    pub async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(_user) => {
                info!("Successfully signed in!");
                Ok(())
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                Err(TelegramError::PasswordRequired(password_token))
            }
            Err(SignInError::InvalidCode) => {
                Err(TelegramError::SignInFailed("Invalid code".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Checks the 2FA password.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is invalid.
    pub async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(_user) => {
                info!("Successfully authenticated with 2FA!");
                Ok(())
            }
            Err(SignInError::InvalidPassword(token)) => Err(TelegramError::InvalidPassword(token)),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        debug!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

#[async_trait]
impl WebAppLauncher for TelegramAccount {
    async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client.is_authorized().await.map_err(TelegramError::from)
    }

    async fn resolve_bot(&self, username: &str) -> Result<BotPeer, TelegramError> {
        let request = tl::functions::contacts::ResolveUsername {
            username: username.trim_start_matches('@').to_owned(),
            referer: None,
        };

        let tl::enums::contacts::ResolvedPeer::Peer(resolved) = self.client.invoke(&request).await?;

        let tl::enums::Peer::User(peer) = resolved.peer else {
            return Err(TelegramError::PeerNotFound(format!("{username} is not a user")));
        };

        resolved
            .users
            .into_iter()
            .find_map(|user| match user {
                tl::enums::User::User(user) if user.id == peer.user_id => Some(BotPeer {
                    user_id: user.id,
                    access_hash: user.access_hash.unwrap_or_default(),
                }),
                _ => None,
            })
            .ok_or_else(|| TelegramError::PeerNotFound(username.to_owned()))
    }

    async fn request_app_url(
        &self,
        bot: &BotPeer,
        target: &WebAppTarget,
    ) -> Result<String, TelegramError> {
        let request = tl::functions::messages::RequestAppWebView {
            write_allowed: true,
            compact: false,
            fullscreen: false,
            peer: tl::types::InputPeerUser {
                user_id: bot.user_id,
                access_hash: bot.access_hash,
            }
            .into(),
            app: tl::types::InputBotAppShortName {
                bot_id: tl::types::InputUser {
                    user_id: bot.user_id,
                    access_hash: bot.access_hash,
                }
                .into(),
                short_name: target.app_short_name.clone(),
            }
            .into(),
            start_param: Some(target.start_param.clone()),
            theme_params: None,
            platform: target.platform.clone(),
        };

        let tl::enums::WebViewResult::Url(result) = self.client.invoke(&request).await?;
        Ok(result.url)
    }
}

impl std::fmt::Debug for TelegramAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAccount").finish_non_exhaustive()
    }
}

fn connection_params(proxy: Option<&ProxyEntry>) -> sender::ConnectionParams {
    let proxy_url = proxy.and_then(|proxy| {
        let url = proxy.mtproto_url();
        if url.is_none() {
            warn!("Proxy {} is not SOCKS5, Telegram connects directly", proxy);
        }
        url
    });

    sender::ConnectionParams {
        proxy_url,
        ..sender::ConnectionParams::default()
    }
}

/// Masks a phone number for logging (shows last 4 digits).
fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}
