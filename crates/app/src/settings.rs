//! Handles settings for the application. Configuration is read from
//! `settings.toml` and can be overridden by environment variables prefixed
//! with `INCOME_BOT__`, e.g. `INCOME_BOT__TELEGRAM__TOKEN`.
//!
//! See `settings.example.toml` for the configuration.
use std::net::IpAddr;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Webhook settings. Without them the bot polls for updates.
#[derive(Debug, Deserialize)]
pub struct Webhook {
    /// Public domain or URL Telegram delivers to.
    pub base_url: String,
    #[serde(default = "default_path")]
    pub path: String,
    pub secret: Option<String>,
    pub host: Option<IpAddr>,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    /// Bot API server, e.g. a self-hosted one. Defaults to `api.telegram.org`.
    pub api_url: Option<String>,
    #[serde(default)]
    pub allowed_users: Vec<u64>,
    pub webhook: Option<Webhook>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Rates {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub currencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub telegram: Telegram,
    #[serde(default)]
    pub rates: Rates,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("INCOME_BOT")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("rates.currencies")
                    .with_list_parse_key("telegram.allowed_users")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_port() -> u16 {
    8080
}
