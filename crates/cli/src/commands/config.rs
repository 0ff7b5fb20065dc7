use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use storefront_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use toml::Value;

/// Renders every effective setting with the layer it came from. The bot token
/// is always redacted.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file_path = detect_config_path();
    let file_doc = load_config_file_doc(file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, Some(env_key), file_doc.as_ref(), file_path.as_deref())
    };

    let database = &config.database;
    let telegram = &config.telegram;
    let storefront = &config.storefront;
    let rows: Vec<(&str, &str, String)> = vec![
        ("database.url", "STOREFRONT_DATABASE_URL", database.url.clone()),
        (
            "database.max_connections",
            "STOREFRONT_DATABASE_MAX_CONNECTIONS",
            database.max_connections.to_string(),
        ),
        ("database.timeout_secs", "STOREFRONT_DATABASE_TIMEOUT_SECS", database.timeout_secs.to_string()),
        (
            "telegram.bot_token",
            "STOREFRONT_TELEGRAM_BOT_TOKEN",
            redact_token(telegram.bot_token.expose_secret()),
        ),
        ("telegram.api_base_url", "STOREFRONT_TELEGRAM_API_BASE_URL", telegram.api_base_url.clone()),
        (
            "telegram.poll_timeout_secs",
            "STOREFRONT_TELEGRAM_POLL_TIMEOUT_SECS",
            telegram.poll_timeout_secs.to_string(),
        ),
        (
            "telegram.idle_delay_ms",
            "STOREFRONT_TELEGRAM_IDLE_DELAY_MS",
            telegram.idle_delay_ms.to_string(),
        ),
        (
            "telegram.max_consecutive_failures",
            "STOREFRONT_TELEGRAM_MAX_CONSECUTIVE_FAILURES",
            telegram.max_consecutive_failures.to_string(),
        ),
        ("storefront.currency_symbol", "STOREFRONT_CURRENCY_SYMBOL", storefront.currency_symbol.clone()),
        ("storefront.guest_owner", "STOREFRONT_GUEST_OWNER", storefront.guest_owner.clone()),
        ("storefront.reply_delay_ms", "STOREFRONT_REPLY_DELAY_MS", storefront.reply_delay_ms.to_string()),
        ("storefront.voice_listen_ms", "STOREFRONT_VOICE_LISTEN_MS", storefront.voice_listen_ms.to_string()),
        ("storefront.voice_transcript", "STOREFRONT_VOICE_TRANSCRIPT", storefront.voice_transcript.clone()),
        (
            "storefront.out_for_delivery_after_secs",
            "STOREFRONT_OUT_FOR_DELIVERY_AFTER_SECS",
            storefront.out_for_delivery_after_secs.to_string(),
        ),
        (
            "storefront.delivered_after_secs",
            "STOREFRONT_DELIVERED_AFTER_SECS",
            storefront.delivered_after_secs.to_string(),
        ),
        ("logging.level", "STOREFRONT_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "STOREFRONT_LOGGING_FORMAT", config.logging.format.as_str().to_string()),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        rows.into_iter()
            .map(|(key_path, env_key, value)| render_line(key_path, &value, source(key_path, env_key))),
    );
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Telegram tokens look like `<bot id>:<secret>`; only the bot id is shown.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<unset>".to_string();
    }

    match trimmed.split_once(':') {
        Some((bot_id, _)) if !bot_id.is_empty() && bot_id.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{bot_id}:***")
        }
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{contains_path, field_source, redact_token, render_line};

    #[test]
    fn tokens_keep_only_the_bot_id() {
        assert_eq!(redact_token("123456:AAE-secret"), "123456:***");
        assert_eq!(redact_token("  "), "<unset>");
        assert_eq!(redact_token("not-a-telegram-token"), "<redacted>");
        assert_eq!(redact_token("abc:def"), "<redacted>");
    }

    #[test]
    fn nested_keys_are_found_in_the_file_document() {
        let doc: toml::Value =
            "[storefront]\ncurrency_symbol = \"$\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "storefront.currency_symbol"));
        assert!(!contains_path(&doc, "storefront.guest_owner"));
        assert!(!contains_path(&doc, "telegram.bot_token"));
    }

    #[test]
    fn file_source_is_reported_when_env_is_absent() {
        let doc: toml::Value = "[logging]\nlevel = \"debug\"\n".parse().expect("toml");
        let source = field_source(
            "logging.level",
            Some("STOREFRONT_TEST_UNSET_VARIABLE"),
            Some(&doc),
            Some(Path::new("storefront.toml")),
        );

        assert_eq!(source, "file (storefront.toml)");
        assert_eq!(
            render_line("logging.level", "debug", source),
            "- logging.level = debug (source: file (storefront.toml))"
        );
        assert_eq!(field_source("logging.format", None, Some(&doc), None), "default");
    }
}
