//! Configuration management for the pac-host application.
//!
//! This module handles loading, parsing and validating the YAML
//! configuration file. Every component receives its settings from these
//! structs; nothing is looked up from process-wide state.

use crate::error::{PacError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Canonical upstream list of domains that should go through the proxy.
pub const DEFAULT_REMOTE_URL: &str =
    "https://github.com/zungmou/pyAutoProxy/raw/master/domains.txt";

/// Some origins reject requests without a browser-like User-Agent.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/75.0.3770.100 Safari/537.36"
);

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port to listen on.
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parses the listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            PacError::config_validation(format!("Invalid listen address: {}", self.listen))
        })
    }
}

/// Domain and proxy source configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    /// Local cache of the domain list.
    pub domains_file: PathBuf,

    /// Operator-provided proxy directives.
    pub proxies_file: PathBuf,

    /// Remote domain list used when the cache is absent.
    pub remote_url: String,

    /// Remote fetch timeout in seconds.
    pub fetch_timeout: u64,

    /// User-Agent sent with the remote fetch.
    pub user_agent: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            domains_file: PathBuf::from("domains.txt"),
            proxies_file: PathBuf::from("proxies.txt"),
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            fetch_timeout: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourcesConfig {
    /// Returns the remote fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable pretty format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON format for structured logging.
    Json,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,

    /// Output destination: stdout, stderr, or file path.
    pub output: String,

    /// Log format.
    pub format: LogFormat,

    /// Include target (module path) in logs.
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: "stdout".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,

    /// Domain and proxy sources.
    pub sources: SourcesConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PacError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = fs::read_to_string(path)?;
        let config: AppConfig =
            serde_yaml::from_str(&contents).map_err(|e| PacError::config_parse(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.server.listen_addr()?;

        let url = reqwest::Url::parse(&self.sources.remote_url).map_err(|e| {
            PacError::config_validation(format!(
                "Invalid remote URL {}: {}",
                self.sources.remote_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PacError::config_validation(format!(
                "Remote URL must use http or https: {}",
                self.sources.remote_url
            )));
        }

        if self.sources.fetch_timeout == 0 {
            return Err(PacError::config_validation(
                "Fetch timeout must be at least one second",
            ));
        }

        if self.sources.domains_file.as_os_str().is_empty()
            || self.sources.proxies_file.as_os_str().is_empty()
        {
            return Err(PacError::config_validation(
                "Domain and proxy file paths cannot be empty",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(PacError::config_validation(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.sources.domains_file, PathBuf::from("domains.txt"));
        assert_eq!(config.sources.proxies_file, PathBuf::from("proxies.txt"));
        assert_eq!(config.sources.fetch_timeout(), Duration::from_secs(10));
        assert!(config.sources.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config() {
        let yaml = r#"
server:
  listen: "0.0.0.0:8000"
sources:
  domains_file: "/var/lib/pac-host/domains.txt"
  proxies_file: "/etc/pac-host/proxies.txt"
  remote_url: "http://lists.example.net/domains.txt"
  fetch_timeout: 3
logging:
  level: "debug"
  output: "stderr"
"#;
        let file = create_temp_config(yaml);
        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:8000");
        assert_eq!(
            config.sources.domains_file,
            PathBuf::from("/var/lib/pac-host/domains.txt")
        );
        assert_eq!(config.sources.remote_url, "http://lists.example.net/domains.txt");
        assert_eq!(config.sources.fetch_timeout(), Duration::from_secs(3));
        assert_eq!(config.sources.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_config() {
        let result = AppConfig::load("/nonexistent/pac-host.yaml");
        assert!(matches!(result, Err(PacError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_unparseable_config() {
        let file = create_temp_config("server: [unterminated");
        let result = AppConfig::load(file.path());
        assert!(matches!(result, Err(PacError::ConfigParse { .. })));
    }

    #[test]
    fn test_invalid_listen_address() {
        let yaml = r#"
server:
  listen: "not-an-address"
"#;
        let file = create_temp_config(yaml);
        let result = AppConfig::load(file.path());
        assert!(matches!(result, Err(PacError::ConfigValidation { .. })));
    }

    #[test]
    fn test_invalid_remote_url() {
        let mut config = AppConfig::default();
        config.sources.remote_url = "ftp://example.com/domains.txt".to_string();
        assert!(config.validate().is_err());

        config.sources.remote_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.sources.fetch_timeout = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let yaml = r#"
logging:
  level: "invalid"
"#;
        let file = create_temp_config(yaml);
        let result = AppConfig::load(file.path());
        assert!(result.is_err());
    }
}
