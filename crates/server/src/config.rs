use std::fs;

use serde::Deserialize;

const SETTINGS_FILE: &str = "server.toml";
const BIND_ENV_KEYS: &[&str] = &["SERVER_BIND", "APP__BIND_ADDR"];
const DATABASE_ENV_KEYS: &[&str] = &["DATABASE_URL", "APP__DATABASE_URL"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            database_url: "sqlite://./data/flashcards.db".into(),
        }
    }
}

/// Keys accepted in `server.toml`; anything else in the file is ignored.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    database_url: Option<String>,
}

/// Defaults, then `server.toml`, then environment. Later env keys win over earlier ones.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let file = match toml::from_str::<FileSettings>(raw) {
        Ok(file) => file,
        Err(error) => {
            tracing::warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file");
            return;
        }
    };
    if let Some(bind_addr) = file.bind_addr {
        settings.server_bind = bind_addr;
    }
    if let Some(database_url) = file.database_url {
        settings.database_url = database_url;
    }
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let last_set = |keys: &[&str]| keys.iter().filter_map(|key| lookup(key)).last();
    if let Some(bind) = last_set(BIND_ENV_KEYS) {
        settings.server_bind = bind;
    }
    if let Some(database_url) = last_set(DATABASE_ENV_KEYS) {
        settings.database_url = database_url;
    }
}

/// Normalizes the URL and makes sure a file-backed database has a directory to live in.
pub fn prepare_database_url(raw: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

/// Accepts bare file paths and `sqlite:` shorthands; other URLs pass through untouched.
fn normalize_database_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return Settings::default().database_url;
    }
    if raw.contains("://") || raw.starts_with("sqlite::memory:") {
        return raw.to_string();
    }
    let path = raw.strip_prefix("sqlite:").unwrap_or(raw).replace('\\', "/");
    format!("sqlite://{path}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
