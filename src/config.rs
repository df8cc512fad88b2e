// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::storage::LocalStorage;
use anyhow::{Error, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

fn default_calendar_path() -> String {
    "termine.ics".to_string()
}
fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}
fn default_footer_text() -> String {
    "If you dont want to get this reminders send: /stop.".to_string()
}
fn default_cycle_interval_hours() -> u32 {
    24
}
fn default_subscribe_delay_secs() -> u64 {
    1
}
fn default_send_timeout_secs() -> u64 {
    10
}
fn default_max_concurrent_sends() -> usize {
    4
}
fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Calendar file; relative paths resolve against the data directory.
    #[serde(default = "default_calendar_path")]
    pub calendar_path: String,
    /// Telegram bot token. Empty means "log messages instead of sending".
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Sent after every daily batch.
    #[serde(default = "default_footer_text")]
    pub footer_text: String,
    #[serde(default = "default_cycle_interval_hours")]
    pub cycle_interval_hours: u32,
    #[serde(default = "default_subscribe_delay_secs")]
    pub subscribe_delay_secs: u64,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendar_path: default_calendar_path(),
            bot_token: String::new(),
            api_url: default_api_url(),
            footer_text: default_footer_text(),
            cycle_interval_hours: default_cycle_interval_hours(),
            subscribe_delay_secs: default_subscribe_delay_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            max_concurrent_sends: default_max_concurrent_sends(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    /// Returns a contextualized error if reading or parsing fails.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Loads the config, writing defaults to disk when none exists yet.
    pub fn load_or_init(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(config) => Ok(config),
            Err(e) if Self::is_missing_config_error(&e) => {
                let config = Self::default();
                config.save(ctx)?;
                log::info!(
                    "Wrote default configuration to {}",
                    Self::get_path_string(ctx)?
                );
                Ok(config)
            }
            Err(e) => Err(e),
        }
    }

    /// Detects whether an error means the config file was missing, either by our
    /// explicit message or an io::ErrorKind::NotFound anywhere in the chain.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }
        err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
        })
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        LocalStorage::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            LocalStorage::atomic_write(&path, toml_str)?;
            Ok(())
        })
    }

    pub fn get_path_string(ctx: &dyn AppContext) -> Result<String> {
        let path = ctx.get_config_file_path()?;
        Ok(path.to_string_lossy().to_string())
    }

    // --- Derived values ---

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.cycle_interval_hours.max(1)) * 60 * 60)
    }

    pub fn subscribe_delay(&self) -> Duration {
        Duration::from_secs(self.subscribe_delay_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs.max(1))
    }

    pub fn has_bot_token(&self) -> bool {
        !self.bot_token.trim().is_empty()
    }

    /// Unknown level names fall back to `Info`.
    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("bot_token = \"123:abc\"\ncycle_interval_hours = 12\n")
            .expect("Parse failed");
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.cycle_interval(), Duration::from_secs(12 * 3600));
        assert_eq!(config.calendar_path, "termine.ics");
        assert_eq!(config.subscribe_delay(), Duration::from_secs(1));
        assert_eq!(config.max_concurrent_sends, 4);
        assert!(config.has_bot_token());
    }

    #[test]
    fn test_missing_file_is_detected_and_initialized() {
        let ctx = TestContext::new();
        let err = Config::load(&ctx).unwrap_err();
        assert!(Config::is_missing_config_error(&err));

        let config = Config::load_or_init(&ctx).unwrap();
        assert_eq!(config, Config::default());
        assert!(ctx.get_config_file_path().unwrap().exists());
        assert_eq!(Config::load(&ctx).unwrap(), config);
    }

    #[test]
    fn test_syntax_error_is_not_missing() {
        let ctx = TestContext::new();
        fs::write(ctx.get_config_file_path().unwrap(), "cycle_interval_hours = [").unwrap();
        let err = Config::load_or_init(&ctx).unwrap_err();
        assert!(!Config::is_missing_config_error(&err));
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_log_level_and_interval_clamps() {
        let config = Config {
            log_level: "debug".to_string(),
            cycle_interval_hours: 0,
            send_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.log_level_filter(), LevelFilter::Debug);
        assert_eq!(config.cycle_interval(), Duration::from_secs(3600));
        assert_eq!(config.send_timeout(), Duration::from_secs(1));

        let config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert_eq!(config.log_level_filter(), LevelFilter::Info);
    }
}
