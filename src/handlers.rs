use async_trait::async_trait;

use crate::commands::{parse_command, CommandHandler, CommandRegistry};
use crate::telegram::Bot;
use crate::types::Message;

const START_TEXT: &str = "Hello! I'm a Rust Telegram bot. Use /help to see available commands.";

const HELP_TEXT: &str = "Available commands:\n\
                         /start - Start the bot\n\
                         /help - Show this help message\n\
                         /echo [text] - Echo back your text";

const ECHO_USAGE: &str = "Usage: /echo [text]";

pub struct StartCommand;

#[async_trait]
impl CommandHandler for StartCommand {
    async fn handle(&self, bot: &Bot, message: &Message) -> anyhow::Result<()> {
        bot.send_message(message.chat_id, START_TEXT).await?;
        Ok(())
    }

    fn description(&self) -> &str {
        "Start the bot"
    }
}

pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn handle(&self, bot: &Bot, message: &Message) -> anyhow::Result<()> {
        bot.send_message(message.chat_id, HELP_TEXT).await?;
        Ok(())
    }

    fn description(&self) -> &str {
        "Show this help message"
    }
}

/// Replies with everything after the command name.
pub struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    async fn handle(&self, bot: &Bot, message: &Message) -> anyhow::Result<()> {
        let reply = parse_command(&message.text)
            .and_then(|cmd| cmd.args)
            .unwrap_or(ECHO_USAGE);
        bot.send_message(message.chat_id, reply).await?;
        Ok(())
    }

    fn description(&self) -> &str {
        "Echo back your text"
    }
}

pub fn register_defaults(registry: &mut CommandRegistry) {
    registry.register("start", StartCommand);
    registry.register("help", HelpCommand);
    registry.register("echo", EchoCommand);
}
