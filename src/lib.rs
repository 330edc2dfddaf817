//! Diamore Tapper Library
//!
//! Automation for the Diamore Telegram mini-game.
//!
//! This crate provides the core functionality for:
//! - Loading Telegram credentials, game settings and proxies
//! - Obtaining the web-app token through a Telegram `MTProto` session
//! - Talking to the game REST API
//! - Running the per-account claim, quest, play, ads and upgrade loop

pub mod config;
pub mod game;
pub mod session;
pub mod telegram;
