use anyhow::{Result, anyhow};
use log::LevelFilter;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://spotter.db";
pub const DEFAULT_RECENT_SET_LIMIT: i64 = 10;

/// Startup configuration, passed explicitly to [`crate::Session::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    /// Rows shown in the recent-set feed.
    pub recent_set_limit: i64,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
            recent_set_limit: DEFAULT_RECENT_SET_LIMIT,
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Single-connection in-memory database; every pooled connection to
    /// `sqlite::memory:` would otherwise see its own empty database.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    /// Reads `DATABASE_URL`, `SPOTTER_MAX_CONNECTIONS`,
    /// `SPOTTER_BUSY_TIMEOUT_MS`, `SPOTTER_RECENT_SET_LIMIT` and
    /// `SPOTTER_LOG_LEVEL`, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_var(&lookup, "SPOTTER_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            busy_timeout: parse_var(&lookup, "SPOTTER_BUSY_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.busy_timeout),
            recent_set_limit: parse_var(&lookup, "SPOTTER_RECENT_SET_LIMIT")?
                .unwrap_or(defaults.recent_set_limit),
            log_level: parse_var(&lookup, "SPOTTER_LOG_LEVEL")?.unwrap_or(defaults.log_level),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(anyhow!("max_connections must be at least 1"));
        }
        if self.recent_set_limit < 1 {
            return Err(anyhow!(
                "recent_set_limit must be at least 1, got {}",
                self.recent_set_limit
            ));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("Invalid value for {}: {:?} ({})", key, raw, e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_keys_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn keys_override_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite:///tmp/gym.db"),
            ("SPOTTER_MAX_CONNECTIONS", "2"),
            ("SPOTTER_BUSY_TIMEOUT_MS", "250"),
            ("SPOTTER_RECENT_SET_LIMIT", " 25 "),
            ("SPOTTER_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite:///tmp/gym.db");
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.recent_set_limit, 25);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = Config::from_lookup(lookup_from(&[("SPOTTER_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("SPOTTER_MAX_CONNECTIONS"), "{}", err);
    }

    #[test]
    fn zero_feed_limit_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("SPOTTER_RECENT_SET_LIMIT", "0")])).is_err());
    }

    #[test]
    fn in_memory_uses_one_connection() {
        let config = Config::in_memory();
        assert_eq!(config.max_connections, 1);
        assert!(config.database_url.contains("memory"));
    }
}
