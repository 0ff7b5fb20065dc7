use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nlu::responder::DEFAULT_CURRENCY_SYMBOL;

pub const DEFAULT_CONFIG_FILE: &str = "storefront.toml";
pub const DEFAULT_VOICE_TRANSCRIPT: &str = "Show me breakfast under 200";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub storefront: StorefrontConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
    pub idle_delay_ms: u64,
    pub max_consecutive_failures: u32,
}

/// Session behaviour shared by the interactive app and the bot.
#[derive(Clone, Debug)]
pub struct StorefrontConfig {
    pub currency_symbol: String,
    pub guest_owner: String,
    pub reply_delay_ms: u64,
    pub voice_listen_ms: u64,
    pub voice_transcript: String,
    pub out_for_delivery_after_secs: u64,
    pub delivered_after_secs: u64,
}

impl StorefrontConfig {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn voice_listen(&self) -> Duration {
        Duration::from_millis(self.voice_listen_ms)
    }

    pub fn out_for_delivery_after(&self) -> Duration {
        Duration::from_secs(self.out_for_delivery_after_secs)
    }

    pub fn delivered_after(&self) -> Duration {
        Duration::from_secs(self.delivered_after_secs)
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub telegram_bot_token: Option<String>,
    pub currency_symbol: Option<String>,
    pub reply_delay_ms: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://storefront.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                api_base_url: "https://api.telegram.org".to_string(),
                poll_timeout_secs: 30,
                idle_delay_ms: 1_000,
                max_consecutive_failures: 10,
            },
            storefront: StorefrontConfig {
                currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
                guest_owner: "guest".to_string(),
                reply_delay_ms: 600,
                voice_listen_ms: 2_000,
                voice_transcript: DEFAULT_VOICE_TRANSCRIPT.to_string(),
                out_for_delivery_after_secs: 10,
                delivered_after_secs: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// The bot token is optional for local commands and mandatory for the
    /// polling bot.
    pub fn require_bot_token(&self) -> Result<&SecretString, ConfigError> {
        if self.telegram.bot_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "telegram.bot_token is required to run the bot. Create one with @BotFather and set STOREFRONT_TELEGRAM_BOT_TOKEN".to_string(),
            ));
        }
        Ok(&self.telegram.bot_token)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(telegram) = patch.telegram {
            if let Some(bot_token) = telegram.bot_token {
                self.telegram.bot_token = bot_token.into();
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
            if let Some(poll_timeout_secs) = telegram.poll_timeout_secs {
                self.telegram.poll_timeout_secs = poll_timeout_secs;
            }
            if let Some(idle_delay_ms) = telegram.idle_delay_ms {
                self.telegram.idle_delay_ms = idle_delay_ms;
            }
            if let Some(max_consecutive_failures) = telegram.max_consecutive_failures {
                self.telegram.max_consecutive_failures = max_consecutive_failures;
            }
        }

        if let Some(storefront) = patch.storefront {
            if let Some(currency_symbol) = storefront.currency_symbol {
                self.storefront.currency_symbol = currency_symbol;
            }
            if let Some(guest_owner) = storefront.guest_owner {
                self.storefront.guest_owner = guest_owner;
            }
            if let Some(reply_delay_ms) = storefront.reply_delay_ms {
                self.storefront.reply_delay_ms = reply_delay_ms;
            }
            if let Some(voice_listen_ms) = storefront.voice_listen_ms {
                self.storefront.voice_listen_ms = voice_listen_ms;
            }
            if let Some(voice_transcript) = storefront.voice_transcript {
                self.storefront.voice_transcript = voice_transcript;
            }
            if let Some(secs) = storefront.out_for_delivery_after_secs {
                self.storefront.out_for_delivery_after_secs = secs;
            }
            if let Some(secs) = storefront.delivered_after_secs {
                self.storefront.delivered_after_secs = secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STOREFRONT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("STOREFRONT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("STOREFRONT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("STOREFRONT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STOREFRONT_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = value.into();
        }
        if let Some(value) = read_env("STOREFRONT_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }
        if let Some(value) = read_env("STOREFRONT_TELEGRAM_POLL_TIMEOUT_SECS") {
            self.telegram.poll_timeout_secs =
                parse_u64("STOREFRONT_TELEGRAM_POLL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_TELEGRAM_IDLE_DELAY_MS") {
            self.telegram.idle_delay_ms = parse_u64("STOREFRONT_TELEGRAM_IDLE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_TELEGRAM_MAX_CONSECUTIVE_FAILURES") {
            self.telegram.max_consecutive_failures =
                parse_u32("STOREFRONT_TELEGRAM_MAX_CONSECUTIVE_FAILURES", &value)?;
        }

        if let Some(value) = read_env("STOREFRONT_CURRENCY_SYMBOL") {
            self.storefront.currency_symbol = value;
        }
        if let Some(value) = read_env("STOREFRONT_GUEST_OWNER") {
            self.storefront.guest_owner = value;
        }
        if let Some(value) = read_env("STOREFRONT_REPLY_DELAY_MS") {
            self.storefront.reply_delay_ms = parse_u64("STOREFRONT_REPLY_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_VOICE_LISTEN_MS") {
            self.storefront.voice_listen_ms = parse_u64("STOREFRONT_VOICE_LISTEN_MS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_VOICE_TRANSCRIPT") {
            self.storefront.voice_transcript = value;
        }
        if let Some(value) = read_env("STOREFRONT_OUT_FOR_DELIVERY_AFTER_SECS") {
            self.storefront.out_for_delivery_after_secs =
                parse_u64("STOREFRONT_OUT_FOR_DELIVERY_AFTER_SECS", &value)?;
        }
        if let Some(value) = read_env("STOREFRONT_DELIVERED_AFTER_SECS") {
            self.storefront.delivered_after_secs =
                parse_u64("STOREFRONT_DELIVERED_AFTER_SECS", &value)?;
        }

        let log_level =
            read_env("STOREFRONT_LOGGING_LEVEL").or_else(|| read_env("STOREFRONT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STOREFRONT_LOGGING_FORMAT").or_else(|| read_env("STOREFRONT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(bot_token) = overrides.telegram_bot_token {
            self.telegram.bot_token = bot_token.into();
        }
        if let Some(currency_symbol) = overrides.currency_symbol {
            self.storefront.currency_symbol = currency_symbol;
        }
        if let Some(reply_delay_ms) = overrides.reply_delay_ms {
            self.storefront.reply_delay_ms = reply_delay_ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_telegram(&self.telegram)?;
        validate_storefront(&self.storefront)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let token = telegram.bot_token.expose_secret().trim();
    if !token.is_empty() {
        let well_formed = token
            .split_once(':')
            .map(|(bot_id, secret)| {
                !bot_id.is_empty()
                    && bot_id.bytes().all(|byte| byte.is_ascii_digit())
                    && !secret.is_empty()
            })
            .unwrap_or(false);
        if !well_formed {
            return Err(ConfigError::Validation(
                "telegram.bot_token must look like `<bot id>:<secret>` as issued by @BotFather"
                    .to_string(),
            ));
        }
    }

    let base_url = telegram.api_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "telegram.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if telegram.poll_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "telegram.poll_timeout_secs must be in range 0..=300".to_string(),
        ));
    }

    if telegram.max_consecutive_failures == 0 {
        return Err(ConfigError::Validation(
            "telegram.max_consecutive_failures must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_storefront(storefront: &StorefrontConfig) -> Result<(), ConfigError> {
    if storefront.currency_symbol.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storefront.currency_symbol must not be empty".to_string(),
        ));
    }

    if storefront.guest_owner.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storefront.guest_owner must not be empty".to_string(),
        ));
    }

    if storefront.voice_transcript.trim().is_empty() {
        return Err(ConfigError::Validation(
            "storefront.voice_transcript must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    telegram: Option<TelegramPatch>,
    storefront: Option<StorefrontPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
    poll_timeout_secs: Option<u64>,
    idle_delay_ms: Option<u64>,
    max_consecutive_failures: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct StorefrontPatch {
    currency_symbol: Option<String>,
    guest_owner: Option<String>,
    reply_delay_ms: Option<u64>,
    voice_listen_ms: Option<u64>,
    voice_transcript: Option<String>,
    out_for_delivery_after_secs: Option<u64>,
    delivered_after_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
