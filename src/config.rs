//! Process configuration loaded from environment variables.
//!
//! Loaded once at startup via [`Config::load`] into a validated struct before
//! any network client is constructed, so a missing or malformed variable is a
//! fatal startup error rather than a runtime `Internal` error.

use serde::Deserialize;

fn default_bind_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_health_addr() -> String {
    "0.0.0.0:8081".into()
}

fn default_queue_addr() -> String {
    "127.0.0.1:6379".into()
}

fn default_queue_password() -> String {
    String::new()
}

fn default_queue_db() -> i64 {
    0
}

fn default_emoji_dir() -> String {
    "./emoji".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_fetch_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_detector_timeout_secs() -> u64 {
    30
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_queue_item_ttl_secs() -> u64 {
    1800
}

fn default_pop_error_delay_ms() -> u64 {
    5000
}

/// Typed, validated process configuration.
///
/// Field names mirror the `EMOJIMISE_`-prefixed environment variables
/// documented for this service, with two unprefixed exceptions
/// (`CACHE_ADDRESS`, `FACEBOX_ADDRESS`) that are required and have no default.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_health_addr")]
    pub health_addr: String,
    #[serde(default = "default_queue_addr")]
    pub queue_addr: String,
    #[serde(default = "default_queue_password")]
    pub queue_password: String,
    #[serde(default = "default_queue_db")]
    pub queue_db: i64,
    pub cache_address: String,
    pub facebox_address: String,
    pub metrics_addr: Option<String>,
    #[serde(default = "default_emoji_dir")]
    pub emoji_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: u64,
    #[serde(default = "default_detector_timeout_secs")]
    pub detector_timeout_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_queue_item_ttl_secs")]
    pub queue_item_ttl_secs: u64,
    #[serde(default = "default_pop_error_delay_ms")]
    pub pop_error_delay_ms: u64,
}

/// A variable loaded from the process environment, formatted for `envy`.
#[derive(Debug, Deserialize)]
struct RawEnv {
    #[serde(rename = "EMOJIMISE_BIND_ADDR", default = "default_bind_addr")]
    bind_addr: String,
    #[serde(rename = "EMOJIMISE_HEALTH_ADDR", default = "default_health_addr")]
    health_addr: String,
    #[serde(rename = "EMOJIMISE_QUEUE_ADDR", default = "default_queue_addr")]
    queue_addr: String,
    #[serde(
        rename = "EMOJIMISE_QUEUE_PASSWORD",
        default = "default_queue_password"
    )]
    queue_password: String,
    #[serde(rename = "EMOJIMISE_QUEUE_DB", default = "default_queue_db")]
    queue_db: i64,
    #[serde(rename = "CACHE_ADDRESS")]
    cache_address: String,
    #[serde(rename = "FACEBOX_ADDRESS")]
    facebox_address: String,
    #[serde(rename = "EMOJIMISE_METRICS_ADDR", default)]
    metrics_addr: Option<String>,
    #[serde(rename = "EMOJIMISE_EMOJI_DIR", default = "default_emoji_dir")]
    emoji_dir: String,
    #[serde(rename = "EMOJIMISE_LOG_LEVEL", default = "default_log_level")]
    log_level: String,
    #[serde(
        rename = "EMOJIMISE_FETCH_MAX_BYTES",
        default = "default_fetch_max_bytes"
    )]
    fetch_max_bytes: u64,
    #[serde(
        rename = "EMOJIMISE_DETECTOR_TIMEOUT_SECS",
        default = "default_detector_timeout_secs"
    )]
    detector_timeout_secs: u64,
    #[serde(
        rename = "EMOJIMISE_FETCH_TIMEOUT_SECS",
        default = "default_fetch_timeout_secs"
    )]
    fetch_timeout_secs: u64,
    #[serde(
        rename = "EMOJIMISE_QUEUE_ITEM_TTL_SECS",
        default = "default_queue_item_ttl_secs"
    )]
    queue_item_ttl_secs: u64,
    #[serde(
        rename = "EMOJIMISE_POP_ERROR_DELAY_MS",
        default = "default_pop_error_delay_ms"
    )]
    pop_error_delay_ms: u64,
}

impl Config {
    /// Loads configuration from the process environment, failing fast on a
    /// missing required variable or an invalid value.
    pub fn load() -> anyhow::Result<Self> {
        let raw: RawEnv = envy::from_env()?;

        if raw.cache_address.trim().is_empty() {
            anyhow::bail!("CACHE_ADDRESS must be set");
        }
        if raw.facebox_address.trim().is_empty() {
            anyhow::bail!("FACEBOX_ADDRESS must be set");
        }
        if raw.fetch_max_bytes == 0 {
            anyhow::bail!("EMOJIMISE_FETCH_MAX_BYTES must be positive");
        }
        if raw.detector_timeout_secs == 0 || raw.fetch_timeout_secs == 0 {
            anyhow::bail!("timeouts must be positive");
        }

        Ok(Config {
            bind_addr: raw.bind_addr,
            health_addr: raw.health_addr,
            queue_addr: raw.queue_addr,
            queue_password: raw.queue_password,
            queue_db: raw.queue_db,
            cache_address: raw.cache_address,
            facebox_address: raw.facebox_address,
            metrics_addr: raw.metrics_addr,
            emoji_dir: raw.emoji_dir,
            log_level: raw.log_level,
            fetch_max_bytes: raw.fetch_max_bytes,
            detector_timeout_secs: raw.detector_timeout_secs,
            fetch_timeout_secs: raw.fetch_timeout_secs,
            queue_item_ttl_secs: raw.queue_item_ttl_secs,
            pop_error_delay_ms: raw.pop_error_delay_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_cache_address() {
        // SAFETY: test-only env mutation, single-threaded by `cargo test`'s default
        // per-binary isolation for this module.
        unsafe {
            std::env::remove_var("CACHE_ADDRESS");
            std::env::remove_var("FACEBOX_ADDRESS");
        }
        assert!(Config::load().is_err());
    }
}
