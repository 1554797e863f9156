use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::rooms::RetentionPolicy;
use crate::scheduler::SchedulerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub room_interval_seconds: u64,
    pub room_retention_minutes: u64,
    pub room_sweep_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: read_env("PORT", 8080)?,
            room_interval_seconds: read_env("ROOM_INTERVAL_SECONDS", 30)?,
            room_retention_minutes: read_env("ROOM_RETENTION_MINUTES", 60)?,
            room_sweep_seconds: read_env("ROOM_SWEEP_SECONDS", 60)?,
        })
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.room_interval_seconds.max(1)),
        }
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            scored_room_ttl: Duration::from_secs(self.room_retention_minutes.saturating_mul(60)),
            sweep_interval: Duration::from_secs(self.room_sweep_seconds.max(1)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            room_interval_seconds: 30,
            room_retention_minutes: 60,
            room_sweep_seconds: 60,
        }
    }
}

fn read_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
