//! Long-polling Telegram bot with a `/command` registry.
//!
//! [`engine::PollingEngine`] fetches updates through a [`telegram::Transport`],
//! decodes them ([`types`]), and hands `/commands` to handlers registered in a
//! [`commands::CommandRegistry`].

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod offset;
pub mod telegram;
pub mod types;
