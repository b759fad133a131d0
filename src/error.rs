use thiserror::Error;

/// Failure talking to the Bot API. Recovered by the polling loop.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Bot API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Bot API error: {description}")]
    Api { description: String },

    #[error("Malformed response body: {0}")]
    Body(String),
}

/// A raw record could not be turned into an `Update` or `Message`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' is not {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Update batch is not an array")]
    NotAnArray,
}

/// Fatal start-up errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Bot token not set (use [telegram] bot_token or TELEGRAM_BOT_TOKEN)")]
    MissingToken,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A command handler was found but did not complete.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Handler for /{command} failed: {source:#}")]
    Handler {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Handler for /{command} panicked: {message}")]
    Panicked { command: String, message: String },
}

/// Failure of a whole polling iteration.
#[derive(Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
