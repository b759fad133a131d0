use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::info;

use crate::error::DispatchError;
use crate::telegram::Bot;
use crate::types::Message;

/// Leading character that marks a command.
pub const TRIGGER: char = '/';

/// A `/command` handler. Side effects only; errors are logged by the engine.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, bot: &Bot, message: &Message) -> anyhow::Result<()>;

    /// One-line summary for logs.
    fn description(&self) -> &str {
        ""
    }
}

/// A command split out of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub name: &'a str,
    pub args: Option<&'a str>,
}

/// `"/echo hello world"` → name `echo`, args `hello world`.
///
/// The name runs up to the first whitespace character; arguments start right
/// after it. Returns `None` if the text does not start with [`TRIGGER`].
pub fn parse_command(text: &str) -> Option<ParsedCommand<'_>> {
    let rest = text.strip_prefix(TRIGGER)?;

    match rest.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((pos, ws)) => {
            let args = &rest[pos + ws.len_utf8()..];
            Some(ParsedCommand {
                name: &rest[..pos],
                args: (!args.is_empty()).then_some(args),
            })
        }
        None => Some(ParsedCommand {
            name: rest,
            args: None,
        }),
    }
}

/// Command name → handler. Filled at start-up, read-only while polling.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Replaces any previous handler for `name`.
    pub fn register(&mut self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        let name = name.into();
        info!(command = %name, "Registered command: {}", handler.description());
        self.handlers.insert(name, Arc::new(handler));
    }

    /// Invoke the handler for `name`.
    ///
    /// `Ok(false)` means no handler is registered; replying to the user is up
    /// to the caller. Errors and panics from the handler come back as
    /// [`DispatchError`].
    pub async fn dispatch(
        &self,
        name: &str,
        bot: &Bot,
        message: &Message,
    ) -> Result<bool, DispatchError> {
        let Some(handler) = self.handlers.get(name) else {
            return Ok(false);
        };

        match AssertUnwindSafe(handler.handle(bot, message))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => Ok(true),
            Ok(Err(source)) => Err(DispatchError::Handler {
                command: name.to_string(),
                source,
            }),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(DispatchError::Panicked {
                    command: name.to_string(),
                    message,
                })
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
