use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};
use pin_scanner::options::{parse_refresh_ms, DEFAULT_REFRESH_MS};

use crate::constants::{
    DEFAULT_DEMO_TICK_MS, DEFAULT_HISTORY_LIMIT, DEFAULT_LOG_BUFFER_LIMIT, DEFAULT_PORT,
    DEFAULT_STATIC_DIR, DEFAULT_TITLE,
};

#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub(crate) port: u16,
    pub(crate) static_dir: String,
    pub(crate) title: String,
    /// Refresh option preselected on the dashboard page.
    pub(crate) refresh_ms: u32,
    pub(crate) demo_tick: Duration,
    pub(crate) log_buffer_limit: usize,
    pub(crate) history_limit: usize,
    pub(crate) disable_background: bool,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        let port = parse_env(&["PORT"], DEFAULT_PORT);
        let static_dir =
            read_env_first(&["STATIC_DIR"]).unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string());
        let title =
            read_env_first(&["PAGE_TITLE", "TITLE"]).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let refresh_ms = read_env_first(&["REFRESH_MS"])
            .map(|value| parse_refresh_ms(&value))
            .unwrap_or(DEFAULT_REFRESH_MS);

        let demo_tick = Duration::from_millis(parse_env(&["DEMO_TICK_MS"], DEFAULT_DEMO_TICK_MS));
        if demo_tick.is_zero() {
            bail!("DEMO_TICK_MS must be greater than zero");
        }

        let log_buffer_limit = parse_env(&["LOG_BUFFER_LIMIT"], DEFAULT_LOG_BUFFER_LIMIT);
        let history_limit = parse_env(&["HISTORY_LIMIT"], DEFAULT_HISTORY_LIMIT);

        let disable_background = env::var("DISABLE_BACKGROUND_TASKS")
            .map(|value| {
                let trimmed = value.trim();
                !trimmed.is_empty() && trimmed != "0"
            })
            .unwrap_or(false);

        Ok(Self {
            port,
            static_dir,
            title,
            refresh_ms,
            demo_tick,
            log_buffer_limit,
            history_limit,
            disable_background,
        })
    }
}

pub(crate) fn read_env_first(keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Ok(value) = env::var(key) {
            let trimmed = value.trim().to_string();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
    }
    None
}

fn parse_env<T: FromStr>(keys: &[&str], default: T) -> T {
    read_env_first(keys)
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}
