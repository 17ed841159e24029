//! Configuration for the event consumer.
//!
//! The process takes no command-line flags; everything comes from the
//! environment, with defaults suitable for a local Redis.

use crate::dispatcher::FailurePolicy;
use crate::error::{ConsumerError, ConsumerResult};
use std::path::PathBuf;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_DATABASE_PATH: &str = "allocation.sqlite3";

/// Event consumer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Redis connection URL (`REDIS_URL`)
    pub redis_url: String,

    /// SQLite database file (`DATABASE_PATH`)
    pub database_path: PathBuf,

    /// What to do with malformed messages and handler failures
    /// (`CONSUMER_FAILURE_POLICY`: `fail-fast` or `skip-and-log`)
    pub failure_policy: FailurePolicy,

    /// Default log level when `RUST_LOG` is unset (`CONSUMER_LOG_LEVEL`)
    pub log_level: String,

    /// Optional JSONL log file (`CONSUMER_LOG_PATH`)
    pub log_path: Option<PathBuf>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            failure_policy: FailurePolicy::FailFast,
            log_level: "info".to_string(),
            log_path: None,
        }
    }
}

impl ConsumerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> ConsumerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConsumerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let failure_policy = match get("CONSUMER_FAILURE_POLICY") {
            Some(value) => value.parse().map_err(|_| {
                ConsumerError::Config(format!(
                    "CONSUMER_FAILURE_POLICY must be 'fail-fast' or 'skip-and-log', got '{}'",
                    value
                ))
            })?,
            None => defaults.failure_policy,
        };

        Ok(Self {
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            failure_policy,
            log_level: get("CONSUMER_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_path: get("CONSUMER_LOG_PATH").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ConsumerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, ConsumerConfig::default());
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert!(config.log_path.is_none());
    }

    #[test]
    fn test_reads_every_variable() {
        let config = ConsumerConfig::from_lookup(lookup(&[
            ("REDIS_URL", "redis://redis:6379"),
            ("DATABASE_PATH", "/var/lib/allocation/db.sqlite3"),
            ("CONSUMER_FAILURE_POLICY", "skip-and-log"),
            ("CONSUMER_LOG_LEVEL", "debug"),
            ("CONSUMER_LOG_PATH", "/var/log/consumer.jsonl"),
        ]))
        .unwrap();

        assert_eq!(config.redis_url, "redis://redis:6379");
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/allocation/db.sqlite3")
        );
        assert_eq!(config.failure_policy, FailurePolicy::SkipAndLog);
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.log_path,
            Some(PathBuf::from("/var/log/consumer.jsonl"))
        );
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = ConsumerConfig::from_lookup(lookup(&[("REDIS_URL", "  ")])).unwrap();
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
    }

    #[test]
    fn test_rejects_unknown_failure_policy() {
        let err = ConsumerConfig::from_lookup(lookup(&[("CONSUMER_FAILURE_POLICY", "retry")]))
            .unwrap_err();
        assert!(matches!(err, ConsumerError::Config(ref msg) if msg.contains("retry")));
    }
}
