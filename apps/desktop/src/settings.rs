use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_CONFIG_NAME: &str = "flashcards";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub server_url: String,
}

/// Defaults, then `flashcards.toml` (or `config_path`), then `FLASHCARDS__*` env vars, then
/// the command-line override.
pub fn load_settings(
    config_path: Option<&Path>,
    server_url_override: Option<String>,
) -> Result<ClientSettings> {
    let file = match config_path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let settings: ClientSettings = Config::builder()
        .set_default("server_url", DEFAULT_SERVER_URL)?
        .add_source(file)
        .add_source(
            Environment::with_prefix("FLASHCARDS")
                .prefix_separator("__")
                .separator("__"),
        )
        .set_override_option("server_url", server_url_override)?
        .build()
        .context("failed to load client settings")?
        .try_deserialize()
        .context("invalid client settings")?;

    Ok(ClientSettings {
        server_url: settings.server_url.trim().trim_end_matches('/').to_string(),
    })
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
