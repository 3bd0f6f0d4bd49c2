/*!
 * Configuration types for Steadfast
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use steadfast_core_resilience::{
    retry_fn, AttemptLimit, ConfigError, ExecutionError, RateLimiter, RetryDecision,
    RetryPredicate, Task, WaitAndRetry,
};

use crate::error::{Result, SteadfastError};

/// Main configuration: limiter, retry policy and logging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SteadfastConfig {
    /// Admission control settings
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Retry policy used by the simulator
    #[serde(default)]
    pub retry: RetryConfig,

    /// Diagnostic output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rate limiter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum permits that can accumulate
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Sustained admission rate; must divide 1000
    #[serde(default = "default_rate_per_second")]
    pub rate_per_second: u32,

    /// What to do with a task that is not admitted
    #[serde(default)]
    pub handler: HandlerKind,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            rate_per_second: default_rate_per_second(),
            handler: HandlerKind::default(),
        }
    }
}

/// Rejected-execution handler selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum HandlerKind {
    /// Fail immediately with a rejection
    #[default]
    FailFast,

    /// Sleep out the wait estimate and try again
    WaitAndRetry {
        /// Cap on sleeps per task (None = unbounded)
        #[serde(default)]
        max_waits: Option<u32>,
    },
}

/// Fixed-delay retry policy for the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per task, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds; rejections wait their own hint
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level for diagnostic output
    #[serde(default)]
    pub level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for level = debug)
    #[serde(default)]
    pub verbose: bool,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_capacity() -> u32 {
    10
}

fn default_rate_per_second() -> u32 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    100
}

impl SteadfastConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| SteadfastError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Render configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every setting that would otherwise only fail once work starts
    pub fn validate(&self) -> Result<()> {
        self.limiter.build::<(), ()>()?;
        if self.retry.max_attempts == 0 {
            return Err(SteadfastError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl LimiterConfig {
    /// Build the configured rate limiter
    pub fn build<T, E>(&self) -> std::result::Result<RateLimiter<T, E>, ConfigError>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let limiter = RateLimiter::new(self.capacity, self.rate_per_second)?;
        Ok(match self.handler {
            HandlerKind::FailFast => limiter,
            HandlerKind::WaitAndRetry { max_waits } => {
                let handler = match max_waits {
                    Some(max) => WaitAndRetry::new().with_max_waits(max),
                    None => WaitAndRetry::new(),
                };
                limiter.with_handler(handler)
            }
        })
    }
}

impl RetryConfig {
    /// Fixed delay between attempts
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Build the fixed-delay predicate described by this config
    ///
    /// Rejections are retried after the limiter's wait hint, task failures
    /// after the fixed delay, at most `max_attempts` attempts in total.
    pub fn predicate<T, E>(&self) -> impl RetryPredicate<T, E>
    where
        T: 'static,
        E: 'static,
    {
        let delay = self.delay();
        AttemptLimit::new(
            retry_fn(move |_, failure: &ExecutionError<E>, task: &Task<T, E>| {
                RetryDecision::retry(failure.wait_hint().unwrap_or(delay), task.clone())
            }),
            self.max_attempts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SteadfastConfig::default();
        assert_eq!(config.limiter.capacity, 10);
        assert_eq!(config.limiter.rate_per_second, 10);
        assert_eq!(config.limiter.handler, HandlerKind::FailFast);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay(), Duration::from_millis(100));
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [limiter]
            capacity = 50
            rate_per_second = 25
            handler = { kind = "wait_and_retry", max_waits = 4 }

            [retry]
            max_attempts = 5
            delay_ms = 20

            [logging]
            level = "debug"
            verbose = true
        "#;

        let config = SteadfastConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.limiter.capacity, 50);
        assert_eq!(config.limiter.rate_per_second, 25);
        assert_eq!(
            config.limiter.handler,
            HandlerKind::WaitAndRetry { max_waits: Some(4) }
        );
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.verbose);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = SteadfastConfig::from_toml_str("[limiter]\nrate_per_second = 100\n").unwrap();
        assert_eq!(config.limiter.capacity, 10);
        assert_eq!(config.limiter.rate_per_second, 100);
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_rate() {
        let config = SteadfastConfig::from_toml_str("[limiter]\ncapacity = 1000\nrate_per_second = 9\n")
            .unwrap();
        match config.validate() {
            Err(SteadfastError::Limiter(ConfigError::RateNotDivisible { rate })) => {
                assert_eq!(rate, 9)
            }
            other => panic!("expected rate error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = SteadfastConfig::from_toml_str("[retry]\nmax_attempts = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(SteadfastError::Config(_))));
    }

    #[test]
    fn test_round_trip_through_file() {
        let mut config = SteadfastConfig::default();
        config.limiter.handler = HandlerKind::WaitAndRetry { max_waits: None };

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = SteadfastConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let err = SteadfastConfig::from_file(Path::new("/nonexistent/steadfast.toml")).unwrap_err();
        assert!(matches!(err, SteadfastError::ConfigRead { .. }));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Info.to_tracing_level(), tracing::Level::INFO);
        assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
