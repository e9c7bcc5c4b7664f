//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Environment variables, when `MAILROOM_DB_PATH` is set
//! 2. Otherwise the first config file found by [`probe_config_paths`]
//!
//! Both JSON and TOML files are accepted. Every loaded config is validated.
//!
//! ## Environment Variables
//! - `MAILROOM_DB_PATH` (required): database file path
//! - `MAILROOM_DB_POOL_SIZE`: connection pool size
//! - `MAILROOM_DB_ENCRYPTION_KEY`: SQLCipher key
//! - `MAILROOM_TABLE_PREFIX`: message table prefix
//! - `MAILROOM_VERSION`: release tag stamped on messages
//! - `MAILROOM_FAILED_RETRY_COUNT`: retry budget per message
//! - `MAILROOM_RETRY_GRACE_SECONDS`: age before a message may be retried
//! - `MAILROOM_RETRY_BATCH_SIZE`: retry candidates per query
//! - `MAILROOM_CLEANUP_ENABLED`: whether the expiry sweeper runs
//! - `MAILROOM_CLEANUP_BATCH_SIZE`: rows deleted per statement
//! - `MAILROOM_CLEANUP_BATCH_PAUSE_MS`: pause between deleting batches
//! - `MAILROOM_CLEANUP_IDLE_INTERVAL`: seconds between sweeps
//!
//! Unset optional variables keep their defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use mailroom_domain::{Config, MailroomError, Result};

/// Load configuration, preferring the environment over files.
///
/// # Errors
/// Returns `MailroomError::Config` when neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `MAILROOM_*` environment variables.
///
/// # Errors
/// Returns `MailroomError::Config` when `MAILROOM_DB_PATH` is missing, a
/// numeric variable does not parse, or the result fails validation.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("MAILROOM_DB_PATH")?;
    if let Some(size) = env_parse("MAILROOM_DB_POOL_SIZE")? {
        config.database.pool_size = size;
    }
    config.database.encryption_key = std::env::var("MAILROOM_DB_ENCRYPTION_KEY").ok();

    if let Ok(prefix) = std::env::var("MAILROOM_TABLE_PREFIX") {
        config.messaging.table_prefix = prefix;
    }
    if let Ok(version) = std::env::var("MAILROOM_VERSION") {
        config.messaging.version = version;
    }
    if let Some(count) = env_parse("MAILROOM_FAILED_RETRY_COUNT")? {
        config.messaging.failed_retry_count = count;
    }
    if let Some(grace) = env_parse("MAILROOM_RETRY_GRACE_SECONDS")? {
        config.messaging.retry_grace_seconds = grace;
    }
    if let Some(batch) = env_parse("MAILROOM_RETRY_BATCH_SIZE")? {
        config.messaging.retry_batch_size = batch;
    }

    config.cleanup.enabled = env_bool("MAILROOM_CLEANUP_ENABLED", config.cleanup.enabled);
    if let Some(batch) = env_parse("MAILROOM_CLEANUP_BATCH_SIZE")? {
        config.cleanup.batch_size = batch;
    }
    if let Some(pause) = env_parse("MAILROOM_CLEANUP_BATCH_PAUSE_MS")? {
        config.cleanup.batch_pause_ms = pause;
    }
    if let Some(idle) = env_parse("MAILROOM_CLEANUP_IDLE_INTERVAL")? {
        config.cleanup.idle_interval_seconds = idle;
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file.
///
/// With `None` the standard locations are probed.
///
/// # Errors
/// Returns `MailroomError::Config` if the file is missing, malformed or
/// fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MailroomError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MailroomError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MailroomError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MailroomError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MailroomError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(MailroomError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing config file among the standard locations
///
/// Checks `config.{json,toml}` and `mailroom.{json,toml}` in the working
/// directory, then `config.{json,toml}` up to two parents, then the same
/// names next to the executable.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_names(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_names(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_names(base: &Path) -> Vec<PathBuf> {
    vec![
        base.join("config.json"),
        base.join("config.toml"),
        base.join("mailroom.json"),
        base.join("mailroom.toml"),
        base.join("../config.json"),
        base.join("../config.toml"),
        base.join("../../config.json"),
        base.join("../../config.toml"),
    ]
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        MailroomError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional variable; unset is `Ok(None)`.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| MailroomError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
