//! Account task: handshake, then the session loop.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::handshake::{fetch_auth_token, retry_transient};
use super::{SessionError, SessionLoop};
use crate::config::{GameSettings, ProxyEntry, TelegramConfig};
use crate::game::{HttpGameApi, agents};
use crate::telegram::{TelegramAccount, WebAppTarget};

/// Session file extension used by the sessions directory.
pub const SESSION_EXTENSION: &str = "session";

/// One account discovered in the sessions directory.
#[derive(Debug, Clone)]
pub struct Account {
    pub name: String,
    pub session_path: PathBuf,
    pub proxy: Option<ProxyEntry>,
}

/// Lists account names from `*.session` files in `dir`, sorted.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn discover_sessions(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(SESSION_EXTENSION)
        })
        .filter_map(|path| path.file_stem()?.to_str().map(str::to_owned))
        .collect();
    names.sort();
    Ok(names)
}

/// Pairs accounts with proxies in round-robin order.
pub fn assign_proxies(
    names: Vec<String>,
    telegram: &TelegramConfig,
    proxies: &[ProxyEntry],
) -> Vec<Account> {
    let mut pool = proxies.iter().cycle();
    names
        .into_iter()
        .map(|name| Account {
            session_path: telegram.session_path(&name),
            proxy: pool.next().cloned(),
            name,
        })
        .collect()
}

/// Runs one account until its session turns out to be invalid.
///
/// Setup failures other than an invalid session are retried. Meant to be
/// spawned inside a span carrying the account name.
pub async fn run_account(
    account: Account,
    telegram: Arc<TelegramConfig>,
    settings: Arc<GameSettings>,
) {
    let setup = retry_transient("account setup", || prepare(&account, &telegram, &settings)).await;
    let api = match setup {
        Ok(api) => api,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    info!("Authorized in the game");

    let mut session = SessionLoop::new(api, settings);
    let err = session.run().await;
    error!("{} (after {} iterations)", err, session.state().iterations);
}

/// Builds the game client and authorizes it through the web app.
async fn prepare(
    account: &Account,
    telegram: &TelegramConfig,
    settings: &GameSettings,
) -> Result<HttpGameApi, SessionError> {
    let user_agent = agents::random_android_chrome(&mut rand::thread_rng());
    debug!("User-Agent: {}", user_agent);

    let mut api = HttpGameApi::new(&settings.api_base_url, &user_agent, account.proxy.as_ref())?;

    if let Some(proxy) = &account.proxy {
        match api.proxy_ip().await {
            Ok(ip) => info!("Proxy {} - IP: {}", proxy, ip),
            Err(e) => warn!("Proxy {} check failed: {}", proxy, e),
        }
    }

    let token = authorize(account, telegram, settings).await?;
    api.set_token(&token)?;
    Ok(api)
}

async fn authorize(
    account: &Account,
    telegram: &TelegramConfig,
    settings: &GameSettings,
) -> Result<String, SessionError> {
    let client =
        TelegramAccount::connect(telegram, &account.session_path, account.proxy.as_ref()).await?;

    let target = WebAppTarget::android(
        &settings.bot_username,
        &settings.app_short_name,
        &settings.ref_id,
    );
    let token = fetch_auth_token(&client, &target, settings.token_format).await;

    client.disconnect();
    token
}
