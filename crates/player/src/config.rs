//! Client configuration.
//!
//! Every setting has a default and can be overridden from the environment
//! (`.env.local` / `.env` are loaded by the binary before this runs).

use std::str::FromStr;
use std::time::Duration;

use crate::infrastructure::websocket::shared::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_KEEPALIVE_SECS, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_DELAY_MS,
};
use crate::infrastructure::websocket::ConnectionPolicy;

/// Default WebSocket base URL for the game server
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8000/v1";

pub const DEFAULT_CHECK_DISPLAY_MS: u64 = 2_000;
pub const DEFAULT_NOTICE_DISPLAY_MS: u64 = 4_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub ws_url: String,
    pub keepalive_interval: Duration,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    /// How long the in-check highlight stays up.
    pub check_display: Duration,
    /// How long a transient notice stays up.
    pub notice_display: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            keepalive_interval: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            check_display: Duration::from_millis(DEFAULT_CHECK_DISPLAY_MS),
            notice_display: Duration::from_millis(DEFAULT_NOTICE_DISPLAY_MS),
        }
    }
}

impl ClientConfig {
    /// Load from `GAMBIT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            ws_url: value("GAMBIT_WS_URL").unwrap_or(defaults.ws_url),
            keepalive_interval: Duration::from_secs(parse_or(
                "GAMBIT_KEEPALIVE_SECS",
                value("GAMBIT_KEEPALIVE_SECS"),
                DEFAULT_KEEPALIVE_SECS,
            )),
            connect_timeout: Duration::from_secs(parse_or(
                "GAMBIT_CONNECT_TIMEOUT_SECS",
                value("GAMBIT_CONNECT_TIMEOUT_SECS"),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            reconnect_delay: Duration::from_millis(parse_or(
                "GAMBIT_RECONNECT_DELAY_MS",
                value("GAMBIT_RECONNECT_DELAY_MS"),
                DEFAULT_RECONNECT_DELAY_MS,
            )),
            max_reconnect_attempts: parse_or(
                "GAMBIT_MAX_RECONNECT_ATTEMPTS",
                value("GAMBIT_MAX_RECONNECT_ATTEMPTS"),
                DEFAULT_MAX_RECONNECT_ATTEMPTS,
            ),
            check_display: Duration::from_millis(parse_or(
                "GAMBIT_CHECK_DISPLAY_MS",
                value("GAMBIT_CHECK_DISPLAY_MS"),
                DEFAULT_CHECK_DISPLAY_MS,
            )),
            notice_display: Duration::from_millis(parse_or(
                "GAMBIT_NOTICE_DISPLAY_MS",
                value("GAMBIT_NOTICE_DISPLAY_MS"),
                DEFAULT_NOTICE_DISPLAY_MS,
            )),
        }
    }

    pub fn connection_policy(&self) -> ConnectionPolicy {
        ConnectionPolicy {
            connect_timeout: self.connect_timeout,
            keepalive_interval: self.keepalive_interval,
            reconnect_delay: self.reconnect_delay,
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Invalid config value, using default");
            default
        }),
    }
}
