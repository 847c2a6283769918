//! Process-level configuration.
//!
//! A [`Config`] is an ordinary value: build one, hand it to a
//! [`Page`](crate::Page) or [`ElementChecker`](crate::ElementChecker), and
//! tests can run side by side with different settings. Nothing here is global.

use crate::result::{PageError, PageResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

/// Default wait budget (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Shortest polling interval the timer will sleep for
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "PAGEWRIGHT_LOG_LEVEL";

/// Environment variable overriding the default timeout (milliseconds)
pub const ENV_TIMEOUT_MS: &str = "PAGEWRIGHT_TIMEOUT_MS";

/// Environment variable overriding the poll interval (milliseconds)
pub const ENV_POLL_INTERVAL_MS: &str = "PAGEWRIGHT_POLL_INTERVAL_MS";

pub(crate) const fn clamp_poll_interval(interval: Duration) -> Duration {
    if interval.as_nanos() < MIN_POLL_INTERVAL.as_nanos() {
        MIN_POLL_INTERVAL
    } else {
        interval
    }
}

// =============================================================================
// LOG LEVEL
// =============================================================================

/// Log verbosity. `Unknown` disables logging entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Every poll iteration and driver query
    Debug,
    /// Verification start and finish
    Info,
    /// Cyclic references and load failures
    Warn,
    /// Errors only
    Error,
    /// Same filter as `Error`
    Fatal,
    /// Logging off
    #[default]
    Unknown,
}

impl LogLevel {
    /// All levels in index order
    pub const ALL: [Self; 6] = [
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
        Self::Unknown,
    ];

    /// Numeric index (0 = `Debug` .. 5 = `Unknown`)
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Level for a numeric index
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Upper-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// `tracing` filter for this level
    #[must_use]
    pub const fn level_filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error | Self::Fatal => LevelFilter::ERROR,
            Self::Unknown => LevelFilter::OFF,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = PageError;

    /// Accepts `debug`, `DEBUG`, `:debug` or an index such as `0`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let name = trimmed.strip_prefix(':').unwrap_or(trimmed);
        if let Ok(index) = name.parse::<usize>() {
            return Self::from_index(index).ok_or_else(|| {
                PageError::configuration(format!("log level index {index} is out of range 0..=5"))
            });
        }
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| PageError::configuration(format!("unrecognized log level {s:?}")))
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Defaults used by checks that do not override them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Wait budget when a call does not give one
    pub default_timeout: Duration,
    /// Sleep between polls
    pub poll_interval: Duration,
    /// Visibility filter for specs that do not declare one
    pub visible_by_default: bool,
    /// Log verbosity
    pub log_level: LogLevel,
    /// Log file; stdout when `None`
    pub log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            visible_by_default: true,
            log_level: LogLevel::Unknown,
            log_path: None,
        }
    }
}

/// On-disk form of [`Config`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    default_timeout_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    visible_by_default: Option<bool>,
    log_level: Option<String>,
    log_path: Option<PathBuf>,
}

impl Config {
    /// Create configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the poll interval, raised to [`MIN_POLL_INTERVAL`] if shorter
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = clamp_poll_interval(interval);
        self
    }

    /// Set the visibility default
    #[must_use]
    pub const fn with_visible_by_default(mut self, visible: bool) -> Self {
        self.visible_by_default = visible;
        self
    }

    /// Set the log level
    #[must_use]
    pub const fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Log to a file instead of stdout
    #[must_use]
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Parse YAML; absent keys keep their defaults
    ///
    /// ```yaml
    /// default_timeout_ms: 2000
    /// poll_interval_ms: 25
    /// visible_by_default: false
    /// log_level: DEBUG
    /// log_path: target/pagewright.log
    /// ```
    pub fn from_yaml_str(yaml: &str) -> PageResult<Self> {
        let file: ConfigFile = if yaml.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        Self::default().merge(file)
    }

    /// Read a YAML config file
    pub fn from_path(path: impl AsRef<Path>) -> PageResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply `PAGEWRIGHT_*` environment overrides
    pub fn with_env_overrides(self) -> PageResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> PageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level.parse()?;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            self.default_timeout = Duration::from_millis(parse_millis(ENV_TIMEOUT_MS, &ms)?);
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval = Duration::from_millis(parse_millis(ENV_POLL_INTERVAL_MS, &ms)?);
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings the timer cannot honor
    pub fn validate(&self) -> PageResult<()> {
        if self.poll_interval.is_zero() {
            return Err(PageError::configuration("poll interval must be greater than zero"));
        }
        Ok(())
    }

    fn merge(mut self, file: ConfigFile) -> PageResult<Self> {
        if let Some(ms) = file.default_timeout_ms {
            self.default_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(visible) = file.visible_by_default {
            self.visible_by_default = visible;
        }
        if let Some(level) = file.log_level {
            self.log_level = level.parse()?;
        }
        if file.log_path.is_some() {
            self.log_path = file.log_path;
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse_millis(key: &str, value: &str) -> PageResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| PageError::configuration(format!("{key}={value:?} is not a whole number of milliseconds")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    mod log_level_tests {
        use super::*;

        #[test]
        fn test_parse_names_any_case() {
            assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
            assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
            assert_eq!(":fatal".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
            assert_eq!(" Unknown ".parse::<LogLevel>().unwrap(), LogLevel::Unknown);
        }

        #[test]
        fn test_parse_index() {
            assert_eq!("0".parse::<LogLevel>().unwrap(), LogLevel::Debug);
            assert_eq!("5".parse::<LogLevel>().unwrap(), LogLevel::Unknown);
            assert!("6".parse::<LogLevel>().is_err());
        }

        #[test]
        fn test_parse_rejects_unknown_names() {
            let err = "verbose".parse::<LogLevel>().unwrap_err();
            assert!(matches!(err, PageError::Configuration { .. }));
        }

        #[test]
        fn test_default_is_off() {
            assert_eq!(LogLevel::default(), LogLevel::Unknown);
            assert_eq!(LogLevel::Unknown.level_filter(), LevelFilter::OFF);
        }

        #[test]
        fn test_fatal_maps_to_error() {
            assert_eq!(LogLevel::Fatal.level_filter(), LevelFilter::ERROR);
        }

        #[test]
        fn test_index_order() {
            for (i, level) in LogLevel::ALL.iter().enumerate() {
                assert_eq!(level.index(), i);
                assert_eq!(LogLevel::from_index(i), Some(*level));
            }
        }

        mod property_tests {
            use super::*;
            use proptest::prelude::*;

            proptest! {
                #[test]
                fn prop_display_round_trips(index in 0usize..6) {
                    let level = LogLevel::from_index(index).unwrap();
                    prop_assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
                    prop_assert_eq!(level.to_string().to_lowercase().parse::<LogLevel>().unwrap(), level);
                }
            }
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = Config::default();
            assert_eq!(config.default_timeout, Duration::from_millis(5_000));
            assert_eq!(config.poll_interval, Duration::from_millis(50));
            assert!(config.visible_by_default);
            assert_eq!(config.log_level, LogLevel::Unknown);
            assert!(config.log_path.is_none());
        }

        #[test]
        fn test_builder_chain() {
            let config = Config::new()
                .with_timeout(Duration::from_secs(1))
                .with_poll_interval(Duration::from_millis(10))
                .with_visible_by_default(false)
                .with_log_level(LogLevel::Info)
                .with_log_path("out.log");
            assert_eq!(config.default_timeout, Duration::from_secs(1));
            assert_eq!(config.poll_interval, Duration::from_millis(10));
            assert!(!config.visible_by_default);
            assert_eq!(config.log_level, LogLevel::Info);
            assert_eq!(config.log_path, Some(PathBuf::from("out.log")));
        }

        #[test]
        fn test_from_yaml() {
            let yaml = "default_timeout_ms: 2000\npoll_interval_ms: 25\nvisible_by_default: false\nlog_level: debug\n";
            let config = Config::from_yaml_str(yaml).unwrap();
            assert_eq!(config.default_timeout, Duration::from_secs(2));
            assert_eq!(config.poll_interval, Duration::from_millis(25));
            assert!(!config.visible_by_default);
            assert_eq!(config.log_level, LogLevel::Debug);
        }

        #[test]
        fn test_empty_yaml_is_default() {
            assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
        }

        #[test]
        fn test_yaml_rejects_unknown_keys() {
            let err = Config::from_yaml_str("timeout: 3\n").unwrap_err();
            assert!(matches!(err, PageError::Yaml(_)));
        }

        #[test]
        fn test_builder_clamps_zero_poll_interval() {
            let config = Config::new().with_poll_interval(Duration::ZERO);
            assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);
            assert!(config.validate().is_ok());

            let config = Config::new().with_poll_interval(Duration::from_micros(200));
            assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);
        }

        #[test]
        fn test_yaml_rejects_zero_poll_interval() {
            let err = Config::from_yaml_str("poll_interval_ms: 0\n").unwrap_err();
            assert!(matches!(err, PageError::Configuration { .. }));
        }

        #[test]
        fn test_yaml_rejects_bad_log_level() {
            assert!(Config::from_yaml_str("log_level: loud\n").is_err());
        }

        #[test]
        fn test_from_path() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("pagewright.yml");
            std::fs::write(&path, "default_timeout_ms: 750\nlog_path: run.log\n").unwrap();

            let config = Config::from_path(&path).unwrap();
            assert_eq!(config.default_timeout, Duration::from_millis(750));
            assert_eq!(config.log_path, Some(PathBuf::from("run.log")));
        }

        #[test]
        fn test_from_missing_path_is_io_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = Config::from_path(dir.path().join("absent.yml")).unwrap_err();
            assert!(matches!(err, PageError::Io(_)));
        }

        #[test]
        fn test_overrides() {
            let vars: HashMap<&str, &str> = [
                (ENV_LOG_LEVEL, "INFO"),
                (ENV_TIMEOUT_MS, "1500"),
                (ENV_POLL_INTERVAL_MS, "5"),
            ]
            .into_iter()
            .collect();
            let config = Config::default()
                .with_overrides(|key| vars.get(key).map(|v| (*v).to_string()))
                .unwrap();
            assert_eq!(config.log_level, LogLevel::Info);
            assert_eq!(config.default_timeout, Duration::from_millis(1500));
            assert_eq!(config.poll_interval, Duration::from_millis(5));
        }

        #[test]
        fn test_override_rejects_garbage() {
            let err = Config::default()
                .with_overrides(|key| (key == ENV_TIMEOUT_MS).then(|| "soon".to_string()))
                .unwrap_err();
            assert!(err.to_string().contains(ENV_TIMEOUT_MS));
        }

        #[test]
        fn test_no_overrides_keeps_config() {
            let config = Config::default().with_overrides(|_| None).unwrap();
            assert_eq!(config, Config::default());
        }
    }
}
