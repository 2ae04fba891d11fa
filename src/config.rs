//! Environment-backed configuration for the alert service.
//!
//! Everything has a safe default except SMTP credentials, which
//! [`crate::delivery::smtp::SmtpMailer::from_env`] reads on its own.

use std::time::Duration;

use crate::delivery::DEFAULT_RETRY_DELAY;
use crate::location::DEFAULT_SENSOR_TIMEOUT;
use crate::recipients::DEFAULT_HELPLINE;

#[derive(Debug, Clone)]
pub struct Config {
    /// Fallback alert recipient when a user has no guardian.
    pub default_helpline: String,
    /// Bound on the live position read.
    pub sensor_timeout: Duration,
    /// Delay before the single delivery retry.
    pub retry_delay: Duration,
    /// HTTP bind address for the service binary.
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_helpline: DEFAULT_HELPLINE.to_string(),
            sensor_timeout: DEFAULT_SENSOR_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_helpline: std::env::var("HELPLINE_EMAIL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.default_helpline),
            sensor_timeout: secs_var("SENSOR_TIMEOUT_SECS").unwrap_or(defaults.sensor_timeout),
            retry_delay: secs_var("ALERT_RETRY_DELAY_SECS").unwrap_or(defaults.retry_delay),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }
}

fn secs_var(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
