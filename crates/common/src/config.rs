//! Harness configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pagecheck.toml";

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL of the site under test
    pub base_url: String,

    /// Number of runners executing catalogs in parallel
    pub workers: usize,

    /// Where result files are written
    pub output_dir: PathBuf,

    pub timeouts: TimeoutConfig,

    pub retry: RetryConfig,

    pub browser: BrowserConfig,

    /// Optional command that serves the site for the duration of a run
    pub site_server: Option<SiteServerConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            workers: 1,
            output_dir: PathBuf::from("test-results"),
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            browser: BrowserConfig::default(),
            site_server: None,
        }
    }
}

/// Per-operation timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for one navigation attempt
    pub navigation_ms: u64,

    /// How long a rule keeps retrying against the live page
    pub locate_ms: u64,

    /// Delay between retries of a rule
    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 30_000,
            locate_ms: 5_000,
            poll_interval_ms: 100,
        }
    }
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn locate(&self) -> Duration {
        Duration::from_millis(self.locate_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Navigation retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total navigation attempts, including the first
    pub navigation_attempts: u32,

    /// Backoff before the next attempt, multiplied by the attempt number
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            navigation_attempts: 2,
            backoff_ms: 500,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Browser engine selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(Error::InvalidConfig(format!("unknown browser: {}", other))),
        }
    }
}

/// Browser session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub engine: BrowserKind,

    pub headless: bool,

    pub viewport_width: u32,

    pub viewport_height: u32,

    /// Executable used to run the Playwright bridge
    pub node_binary: PathBuf,

    /// Directory whose node_modules provides `playwright`
    pub node_project_dir: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_binary: PathBuf::from("node"),
            node_project_dir: PathBuf::from("."),
        }
    }
}

/// Command that serves the site under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteServerConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Path polled until the server answers 2xx
    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
}

fn default_health_path() -> String {
    "/".to_string()
}

fn default_startup_timeout_ms() -> u64 {
    60_000
}

impl SiteServerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "base_url must be http(s): {}",
                self.base_url
            )));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1".to_string()));
        }
        if self.retry.navigation_attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry.navigation_attempts must be at least 1".to_string(),
            ));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "timeouts.poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Join a base URL and a '/'-prefixed path without doubling the slash
pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("pagecheck.toml")).unwrap();
        assert_eq!(config.workers, 1);
        assert_eq!(config.retry.navigation_attempts, 2);
        assert_eq!(config.timeouts.locate(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagecheck.toml");
        std::fs::write(
            &path,
            r#"
base_url = "http://localhost:4000/"
workers = 4

[browser]
engine = "firefox"

[site_server]
command = "npx"
args = ["http-server", "_site", "-p", "4000"]
"#,
        )
        .unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.browser.engine, BrowserKind::Firefox);
        assert!(config.browser.headless);
        assert_eq!(config.timeouts.navigation_ms, 30_000);

        let server = config.site_server.as_ref().unwrap();
        assert_eq!(server.health_path, "/");
        assert_eq!(server.args.len(), 4);

        assert_eq!(join_url(&config.base_url, "/agenda"), "http://localhost:4000/agenda");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pagecheck.toml");
        let mut config = HarnessConfig::default();
        config.workers = 3;
        config.save(&path).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded.workers, 3);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = HarnessConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("WebKit".parse::<BrowserKind>().unwrap(), BrowserKind::Webkit);
        assert!("lynx".parse::<BrowserKind>().is_err());
    }
}
