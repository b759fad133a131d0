use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable that overrides `[telegram] bot_token`.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Read when no path is given on the command line.
pub const DEFAULT_PATH: &str = "config.toml";

/// Telegram caps the long-poll timeout at 50 seconds.
const MAX_POLL_TIMEOUT_SECS: u64 = 50;

/// Slack added on top of the long-poll timeout for the HTTP request itself.
const REQUEST_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PollingConfig {
    /// Server-side long-poll wait per `getUpdates` call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Pause between iterations.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Extra pause after a failed iteration.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_interval_ms() -> u64 {
    500
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: default_api_url(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            interval_ms: default_interval_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// HTTP timeout for a single Bot API request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs) + REQUEST_GRACE
    }
}

impl Config {
    /// Load the config file, then apply the environment.
    ///
    /// An explicitly named file must exist. Without one, `config.toml` is
    /// read if present, otherwise defaults apply and the token must come from
    /// `TELEGRAM_BOT_TOKEN`.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::read_file(path, true)?,
            None => Self::read_file(Path::new(DEFAULT_PATH), false)?,
        };

        config
            .with_env_token(std::env::var(TOKEN_ENV).ok())
            .validated()
    }

    fn read_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn with_env_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
        self
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.telegram.bot_token = self.telegram.bot_token.trim().to_string();
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if !(1..=MAX_POLL_TIMEOUT_SECS).contains(&self.polling.timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "polling.timeout_secs must be between 1 and {}, got {}",
                MAX_POLL_TIMEOUT_SECS, self.polling.timeout_secs
            )));
        }
        if self.telegram.api_url.is_empty() {
            return Err(ConfigError::Invalid("telegram.api_url is empty".to_string()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = Config::parse("[telegram]\nbot_token = \"123:abc\"\n").unwrap();
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.polling, PollingConfig::default());
        assert_eq!(config.polling.timeout_secs, 30);
        assert_eq!(config.polling.interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [telegram]
            bot_token = "123:abc"
            api_url = "http://localhost:8081"

            [polling]
            timeout_secs = 10
            interval_ms = 100
            retry_delay_ms = 2000
            "#,
        )
        .unwrap()
        .validated()
        .unwrap();
        assert_eq!(config.telegram.api_url, "http://localhost:8081");
        assert_eq!(config.polling.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.polling.request_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_env_token_overrides_file() {
        let config = Config::parse("[telegram]\nbot_token = \"from-file\"\n")
            .unwrap()
            .with_env_token(Some("from-env".to_string()))
            .validated()
            .unwrap();
        assert_eq!(config.telegram.bot_token, "from-env");
    }

    #[test]
    fn test_blank_env_token_ignored() {
        let config = Config::parse("[telegram]\nbot_token = \"from-file\"\n")
            .unwrap()
            .with_env_token(Some("  ".to_string()))
            .validated()
            .unwrap();
        assert_eq!(config.telegram.bot_token, "from-file");
    }

    #[test]
    fn test_missing_token_is_error() {
        let err = Config::default().with_env_token(None).validated().unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn test_timeout_out_of_range() {
        let err = Config::parse("[telegram]\nbot_token = \"t\"\n[polling]\ntimeout_secs = 0\n")
            .unwrap()
            .validated()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::parse("[telegram\nbot_token = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/pollbot-typo.toml"))).unwrap_err();
        match err {
            ConfigError::Read { path, source } => {
                assert_eq!(path, "/nonexistent/pollbot-typo.toml");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_default_missing_file_falls_back_to_defaults() {
        let config = Config::read_file(Path::new("/nonexistent/config.toml"), false).unwrap();
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.polling, PollingConfig::default());

        let err = config.with_env_token(None).validated().unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn test_read_file_parses_existing_file() {
        let path = std::env::temp_dir().join(format!("pollbot-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[telegram]\nbot_token = \"123:abc\"\n[polling]\ninterval_ms = 50\n").unwrap();

        let config = Config::read_file(&path, true).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.polling.interval_ms, 50);
    }
}
