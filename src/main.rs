//! Diamore Tapper - Main Entry Point
//!
//! Runs the game loop for every Telegram session found in the sessions
//! directory, or registers a new session with `--add-session`.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use dialoguer::{Input, Password};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use diamore_tapper::config::{GameSettings, TelegramConfig, load_proxies};
use diamore_tapper::session::{assign_proxies, discover_sessions, run_account};
use diamore_tapper::telegram::{TelegramAccount, TelegramError, WebAppLauncher};

/// Diamore mini-game tapper for Telegram accounts.
#[derive(Parser, Debug)]
#[command(name = "diamore_tapper")]
#[command(about = "Play the Diamore mini-game on all configured Telegram sessions")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Sign in a new session with this name and exit.
    #[arg(long, value_name = "NAME")]
    add_session: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    if let Some(name) = args.add_session {
        return add_session(&tg_config, &name).await;
    }

    let settings =
        GameSettings::from_env().context("Failed to load game settings from environment")?;

    let names = discover_sessions(&tg_config.sessions_dir).with_context(|| {
        format!(
            "Failed to read sessions directory {}",
            tg_config.sessions_dir.display()
        )
    })?;
    if names.is_empty() {
        bail!(
            "No sessions found in {}. Add one with --add-session NAME",
            tg_config.sessions_dir.display()
        );
    }

    let proxies = match settings.proxy_path() {
        Some(path) => load_proxies(path)
            .with_context(|| format!("Failed to load proxies from {}", path.display()))?,
        None => Vec::new(),
    };

    info!(
        "Detected {} sessions | {} proxies",
        names.len(),
        proxies.len()
    );

    let accounts = assign_proxies(names, &tg_config, &proxies);
    let tg_config = Arc::new(tg_config);
    let settings = Arc::new(settings);

    let mut tasks = JoinSet::new();
    for account in accounts {
        let span = info_span!("account", name = %account.name);
        tasks.spawn(
            run_account(account, Arc::clone(&tg_config), Arc::clone(&settings)).instrument(span),
        );
    }

    info!("Tapper is running. Use Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        () = join_all(&mut tasks) => {
            warn!("All account tasks finished");
        }
    }

    tasks.abort_all();
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn join_all(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            warn!("Account task failed: {}", e);
        }
    }
}

/// Creates a session file through interactive sign in.
async fn add_session(config: &TelegramConfig, name: &str) -> Result<()> {
    std::fs::create_dir_all(&config.sessions_dir).with_context(|| {
        format!(
            "Failed to create sessions directory {}",
            config.sessions_dir.display()
        )
    })?;

    let path = config.session_path(name);
    let account = TelegramAccount::connect(config, &path, None)
        .await
        .context("Failed to open session")?;

    if account
        .is_authorized()
        .await
        .context("Failed to check authorization")?
    {
        info!("Session {} is already signed in", name);
    } else {
        authenticate(&account, config).await?;
        info!("Session {} saved to {}", name, path.display());
    }

    account.disconnect();
    Ok(())
}

/// Handles Telegram authentication.
async fn authenticate(account: &TelegramAccount, config: &TelegramConfig) -> Result<()> {
    info!("Authentication required");

    let phone: String = Input::new()
        .with_prompt("Enter your phone number (with country code)")
        .interact_text()?;

    let token = account
        .request_login_code(&phone, &config.api_hash)
        .await
        .context("Failed to request login code")?;

    info!("Login code sent to your Telegram app");

    let code: String = Input::new()
        .with_prompt("Enter the login code")
        .interact_text()?;

    match account.sign_in(&token, &code).await {
        Ok(()) => Ok(()),
        Err(TelegramError::PasswordRequired(password_token)) => {
            info!("Two-factor authentication is enabled");

            let hint = password_token.hint().unwrap_or("no hint");
            info!("Password hint: {}", hint);

            let password: String = Password::new()
                .with_prompt("Enter your 2FA password")
                .interact()?;

            account
                .check_password(password_token, &password)
                .await
                .context("2FA authentication failed")?;
            Ok(())
        }
        Err(e) => Err(e).context("Authentication failed"),
    }
}
