//! Environment-driven runtime configuration for the dashboard server.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheSettings;
use crate::retry::{Backoff, RetryPolicy};

pub const DEFAULT_API_URL: &str = "https://brvm-api-gateway.onrender.com";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub api_url: String,
    pub bind_addr: SocketAddr,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub cache: CacheSettings,
    pub use_demo: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8501)),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache: CacheSettings::default(),
            use_demo: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
    #[error("BRVM_API_RETRIES must be >= 1")]
    ZeroAttempts,
    #[error("BRVM_API_TIMEOUT_SECS must be >= 1")]
    ZeroTimeout,
}

pub fn dashboard_config_from_env() -> Result<DashboardConfig, ConfigError> {
    let mut config = DashboardConfig::default();

    if let Some(raw) = read_var("BRVM_API_URL") {
        config.api_url = raw;
    }

    if let Some(raw) = read_var("BRVM_DASHBOARD_ADDR") {
        config.bind_addr = raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: "BRVM_DASHBOARD_ADDR",
            value: raw.clone(),
        })?;
    }

    if let Some(attempts) = parse_var::<u32>("BRVM_API_RETRIES")? {
        if attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        config.retry.attempts = attempts;
    }

    if let Some(secs) = parse_var::<u64>("BRVM_API_RETRY_DELAY_SECS")? {
        config.retry.delay = Duration::from_secs(secs);
    }

    if let Some(raw) = read_var("BRVM_API_BACKOFF") {
        config.retry.backoff = match raw.to_ascii_lowercase().as_str() {
            "fixed" => Backoff::Fixed,
            "escalating" => Backoff::Escalating,
            _ => {
                return Err(ConfigError::InvalidValue {
                    var: "BRVM_API_BACKOFF",
                    value: raw,
                })
            }
        };
    }

    if let Some(secs) = parse_var::<u64>("BRVM_API_TIMEOUT_SECS")? {
        if secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        config.request_timeout = Duration::from_secs(secs);
    }

    if let Some(secs) = parse_var::<u64>("BRVM_CACHE_COMPANIES_TTL_SECS")? {
        config.cache.ttls.companies = Duration::from_secs(secs);
    }
    if let Some(secs) = parse_var::<u64>("BRVM_CACHE_ANALYSIS_TTL_SECS")? {
        config.cache.ttls.analysis = Duration::from_secs(secs);
    }
    if let Some(secs) = parse_var::<u64>("BRVM_CACHE_SCREENER_TTL_SECS")? {
        config.cache.ttls.screener = Duration::from_secs(secs);
    }

    if let Some(enabled) = parse_bool_var("BRVM_CACHE_ENABLED")? {
        config.cache.enabled = enabled;
    }
    if let Some(use_demo) = parse_bool_var("BRVM_DASHBOARD_USE_DEMO")? {
        config.use_demo = use_demo;
    }

    Ok(config)
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Trimmed value of `var`, `None` when unset or blank.
pub(crate) fn read_var(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_var<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match read_var(var) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        None => Ok(None),
    }
}

fn parse_bool_var(var: &'static str) -> Result<Option<bool>, ConfigError> {
    match read_var(var) {
        Some(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or(ConfigError::InvalidValue { var, value: raw }),
        None => Ok(None),
    }
}
