//! Bridge connection settings.

use crate::error::{BridgeError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Address the bridge listens on when nothing else is configured.
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:30003";

const ENV_URL: &str = "KRAKEN_BRIDGE_URL";
const ENV_TIMEOUT: &str = "KRAKEN_BRIDGE_TIMEOUT_MS";
const ENV_DISCOVERY_INTERVAL: &str = "KRAKEN_DISCOVERY_INTERVAL_MS";

/// Connection and pacing settings shared by every bridge request.
///
/// Deserializable so a host can embed it in its own settings file; missing
/// keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL of the bridge, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Minimum time between two discovery probes, in milliseconds.
    pub discovery_interval_ms: u64,
    /// Lead time subtracted from each throttled frame interval, in milliseconds.
    pub frame_lead_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BRIDGE_URL.to_string(),
            timeout_ms: 1000,
            discovery_interval_ms: 2000,
            frame_lead_ms: 15,
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `KRAKEN_BRIDGE_URL`, `KRAKEN_BRIDGE_TIMEOUT_MS`
    /// and `KRAKEN_DISCOVERY_INTERVAL_MS` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads keys through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_URL) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            config.timeout_ms = parse_millis(ENV_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DISCOVERY_INTERVAL) {
            config.discovery_interval_ms = parse_millis(ENV_DISCOVERY_INTERVAL, &raw)?;
        }

        Ok(config)
    }

    /// Full URL for a bridge path such as `/frame`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Minimum time between discovery probes.
    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<u64> {
    raw.trim().parse().map_err(|_| BridgeError::Config {
        key,
        value: raw.to_string(),
    })
}
