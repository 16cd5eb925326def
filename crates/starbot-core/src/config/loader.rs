//! Config loader — reads `~/.starbot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.starbot/config.json`
//! 3. Environment variables (override JSON):
//!    `STARBOT_API_KEY`, `STARBOT_BASE_URL`, `STARBOT_MODEL`,
//!    `STARBOT_MAX_ITERATIONS`, `STARBOT_CONFIRM_DANGEROUS`

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given path (or the default one) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_env_overrides(load_config_from_path(&config_path))
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&config_path, json)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    debug!("Config saved to {}", config_path.display());
    Ok(config_path)
}

/// Apply environment variable overrides on top of a loaded config.
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Override logic, parameterised over the variable source so tests need not
/// touch the process environment.
fn apply_overrides(mut config: Config, source: impl Fn(&str) -> Option<String>) -> Config {
    // Set-but-empty variables leave the file value alone.
    let var = |key: &str| source(key).filter(|v| !v.is_empty());

    if let Some(val) = var("STARBOT_API_KEY") {
        config.model.api_key = val;
    }
    if let Some(val) = var("STARBOT_BASE_URL") {
        config.model.base_url = val;
    }
    if let Some(val) = var("STARBOT_MODEL") {
        config.model.model = val;
    }
    if let Some(val) = var("STARBOT_MAX_ITERATIONS") {
        match val.parse::<u32>() {
            Ok(n) => config.agent.max_iterations = n,
            Err(_) => warn!(value = %val, "ignoring invalid STARBOT_MAX_ITERATIONS"),
        }
    }
    if let Some(val) = var("STARBOT_CONFIRM_DANGEROUS") {
        config.agent.confirm_dangerous = !matches!(val.as_str(), "0" | "false" | "no");
    }
    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
