//! The long-polling loop.
//!
//! One task fetches a batch, dispatches each update inline, and advances the
//! offset after each dispatch completes. Delivery is at-least-once: a crash
//! between fetch and advance redelivers the batch on restart.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::commands::{parse_command, CommandRegistry};
use crate::config::PollingConfig;
use crate::error::{DecodeError, PollError};
use crate::offset::OffsetTracker;
use crate::telegram::Bot;
use crate::types::{raw_update_id, Update};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Polling,
    Stopping,
    Stopped,
}

pub struct PollingEngine {
    bot: Bot,
    registry: CommandRegistry,
    config: PollingConfig,
    offset: OffsetTracker,
    state: EngineState,
}

impl PollingEngine {
    pub fn new(bot: Bot, registry: CommandRegistry, config: PollingConfig) -> Self {
        Self {
            bot,
            registry,
            config,
            offset: OffsetTracker::new(),
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn offset(&self) -> i64 {
        self.offset.current()
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Cancellation is checked at the top of each iteration; an in-flight
    /// request or handler always runs to completion. Only sleeps are cut short.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        match self.state {
            EngineState::Idle => {}
            EngineState::Stopped => {
                warn!("Polling engine already stopped");
                return;
            }
            EngineState::Polling | EngineState::Stopping => return,
        }

        self.state = EngineState::Polling;
        info!(
            bot = %self.bot.username(),
            commands = ?self.registry.names(),
            timeout_secs = self.config.timeout_secs,
            "Polling started"
        );

        loop {
            if shutdown.is_cancelled() {
                self.state = EngineState::Stopping;
                info!(offset = self.offset.current(), "Stop requested, finishing");
                break;
            }

            if let Err(e) = self.poll_once().await {
                warn!(error = %e, "Polling iteration failed, retrying");
                pause(&shutdown, self.config.retry_delay()).await;
            }

            pause(&shutdown, self.config.interval()).await;
        }

        self.state = EngineState::Stopped;
        info!("Polling stopped");
    }

    /// One fetch and dispatch cycle. Returns how many updates were consumed.
    pub async fn poll_once(&mut self) -> Result<usize, PollError> {
        let result = self
            .bot
            .get_updates(self.offset.current(), self.config.timeout_secs)
            .await?;
        let batch = Update::decode_batch(&result)?;
        let records = result.as_array().map(Vec::as_slice).unwrap_or_default();

        if !batch.is_empty() {
            debug!(count = batch.len(), offset = self.offset.current(), "Received updates");
        }

        let count = batch.len();
        for (decoded, raw) in batch.into_iter().zip(records) {
            match decoded {
                Ok(update) => {
                    self.process_update(&update).await;
                    self.offset.advance(update.update_id);
                }
                Err(e) => self.skip_malformed(raw, &e),
            }
        }

        Ok(count)
    }

    async fn process_update(&self, update: &Update) {
        let Some(message) = &update.message else {
            debug!(update_id = update.update_id, "Skipping non-message update");
            return;
        };

        let Some(command) = parse_command(&message.text) else {
            return;
        };

        info!(
            update_id = update.update_id,
            chat_id = message.chat_id,
            from = message.from_username.as_deref().unwrap_or("-"),
            command = command.name,
            "Dispatching command"
        );

        match self.registry.dispatch(command.name, &self.bot, message).await {
            Ok(true) => {}
            Ok(false) => {
                let reply = format!("Unknown command: /{}", command.name);
                if let Err(e) = self.bot.send_message(message.chat_id, &reply).await {
                    error!(chat_id = message.chat_id, error = %e, "Failed to send unknown-command reply");
                }
            }
            Err(e) => {
                error!(update_id = update.update_id, error = %e, "Command handler failed");
            }
        }
    }

    fn skip_malformed(&mut self, raw: &Value, err: &DecodeError) {
        match raw_update_id(raw) {
            Some(id) => {
                warn!(update_id = id, error = %err, "Skipping malformed update");
                self.offset.advance(id);
            }
            None => warn!(error = %err, "Skipping update without a readable update_id"),
        }
    }
}

/// Sleep for `duration` unless shutdown is requested first.
async fn pause(shutdown: &CancellationToken, duration: Duration) {
    if duration.is_zero() {
        return;
    }
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}
