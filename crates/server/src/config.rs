use std::{fmt, fs};

use serde::Deserialize;
use tracing::warn;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("development") {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    /// Only development echoes internal error detail to clients.
    pub fn exposes_error_detail(self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub environment: Environment,
    pub default_user_id: String,
    pub assistant_url: Option<String>,
    pub assistant_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3001,
            database_url: "sqlite://./data/itinerary.db".into(),
            environment: Environment::Development,
            default_user_id: "12345".into(),
            assistant_url: None,
            assistant_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    host: Option<String>,
    port: Option<u16>,
    database_url: Option<String>,
    environment: Option<String>,
    default_user_id: Option<String>,
    assistant_url: Option<String>,
    assistant_timeout_secs: Option<u64>,
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    load_settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file, then environment variables.
pub fn load_settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(error) => warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file"),
        }
    }

    let lookup = |keys: &[&str]| keys.iter().rev().find_map(|key| env(key));

    if let Some(v) = lookup(&["HOST", "APP__HOST"]) {
        settings.host = v;
    }
    if let Some(v) = lookup(&["PORT", "APP__PORT"]) {
        match v.parse::<u16>() {
            Ok(port) => settings.port = port,
            Err(_) => warn!(value = %v, "ignoring invalid PORT"),
        }
    }
    if let Some(v) = lookup(&["DATABASE_URL", "APP__DATABASE_URL"]) {
        settings.database_url = v;
    }
    if let Some(v) = lookup(&["APP_ENV", "APP__ENVIRONMENT"]) {
        settings.environment = Environment::parse(&v);
    }
    if let Some(v) = env("DEFAULT_USER_ID").filter(|v| !v.trim().is_empty()) {
        settings.default_user_id = v;
    }
    if let Some(v) = env("ASSISTANT_URL") {
        settings.assistant_url = Some(v).filter(|v| !v.trim().is_empty());
    }
    if let Some(v) = env("ASSISTANT_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.assistant_timeout_secs = parsed;
        }
    }

    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.host {
        settings.host = v;
    }
    if let Some(v) = file_cfg.port {
        settings.port = v;
    }
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.environment {
        settings.environment = Environment::parse(&v);
    }
    if let Some(v) = file_cfg.default_user_id {
        settings.default_user_id = v;
    }
    if let Some(v) = file_cfg.assistant_url {
        settings.assistant_url = Some(v);
    }
    if let Some(v) = file_cfg.assistant_timeout_secs {
        settings.assistant_timeout_secs = v;
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
