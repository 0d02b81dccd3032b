//! Logging configuration for docqa
//!
//! Environment variables:
//! - RUST_LOG: EnvFilter directives (default: info)
//! - MONITORING_ENABLED: set to false to install no subscriber at all
//! - LOG_FORMAT: json or text, for the log file
//! - LOG_DIR: where daily log files go (default: ~/.docqa/logs)
//! - LOG_CONSOLE: mirror logs to stderr (default: false)
//! - LOG_FILE: write the log file (default: true)

use std::path::PathBuf;

const LOG_HOME: &str = ".docqa";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    /// Case-insensitive; anything unrecognised yields `None`
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "text" | "plain" => Some(LogFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// EnvFilter directives, e.g. `info` or `docqa=debug,reqwest=warn`
    pub filter: String,
    pub file_format: LogFormat,
    pub log_dir: PathBuf,
    pub log_to_file: bool,
    /// Off by default so log lines do not interleave with the chat
    pub log_to_console: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: "info".to_string(),
            file_format: LogFormat::Json,
            log_dir: Self::default_log_dir(),
            log_to_file: true,
            log_to_console: false,
        }
    }
}

fn flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl MonitoringConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparseable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_flag = |key: &str, default: bool| get(key).and_then(|v| flag(&v)).unwrap_or(default);

        Self {
            enabled: get_flag("MONITORING_ENABLED", defaults.enabled),
            filter: get("RUST_LOG").unwrap_or(defaults.filter),
            file_format: get("LOG_FORMAT")
                .and_then(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.file_format),
            log_dir: get("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            log_to_file: get_flag("LOG_FILE", defaults.log_to_file),
            log_to_console: get_flag("LOG_CONSOLE", defaults.log_to_console),
        }
    }

    /// `~/.docqa/logs`, or under the temp dir when there is no home directory
    pub fn default_log_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(LOG_HOME)
            .join("logs")
    }

    pub fn ensure_log_dir(&self) -> std::io::Result<()> {
        if self.log_dir.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.log_dir)?;
        tracing::info!(path = %self.log_dir.display(), "Created log directory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> MonitoringConfig {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        MonitoringConfig::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_keep_console_quiet() {
        let config = load(&[]);
        assert!(config.enabled);
        assert_eq!(config.filter, "info");
        assert_eq!(config.file_format, LogFormat::Json);
        assert!(config.log_to_file);
        assert!(!config.log_to_console);
        assert!(config.log_dir.ends_with(".docqa/logs"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("RUST_LOG", "docqa=debug"),
            ("LOG_FORMAT", "TEXT"),
            ("LOG_DIR", "/var/log/docqa"),
            ("LOG_CONSOLE", "yes"),
            ("LOG_FILE", "0"),
            ("MONITORING_ENABLED", "off"),
        ]);
        assert!(!config.enabled);
        assert_eq!(config.filter, "docqa=debug");
        assert_eq!(config.file_format, LogFormat::Text);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/docqa"));
        assert!(config.log_to_console);
        assert!(!config.log_to_file);
    }

    #[test]
    fn test_garbage_values_fall_back() {
        let config = load(&[("LOG_FORMAT", "xml"), ("LOG_FILE", "maybe")]);
        assert_eq!(config.file_format, LogFormat::Json);
        assert!(config.log_to_file);
        assert_eq!(LogFormat::parse("plain"), Some(LogFormat::Text));
    }

    #[test]
    fn test_ensure_log_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitoringConfig {
            log_dir: dir.path().join("a").join("b"),
            ..Default::default()
        };
        config.ensure_log_dir().unwrap();
        assert!(config.log_dir.is_dir());
        config.ensure_log_dir().unwrap();
    }
}
