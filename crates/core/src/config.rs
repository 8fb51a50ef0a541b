// crates/core/src/config.rs
//! Task runner and dashboard configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Options for one task runner instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    /// Human-readable name used in notifications and error messages.
    pub label: String,
    pub poll_interval: Duration,
    pub show_notifications: bool,
    /// Include the underlying error detail in failure messages.
    pub notify_on_error: bool,
    /// Give up waiting for the job after this long. `None` polls forever.
    pub timeout: Option<Duration>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            label: "undefined".into(),
            poll_interval: Duration::from_millis(1000),
            show_notifications: true,
            notify_on_error: true,
            timeout: None,
        }
    }
}

impl TaskConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self::default().with_label(label)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_notifications(mut self) -> Self {
        self.show_notifications = false;
        self
    }

    /// Report failures with the generic message only.
    pub fn with_generic_errors(mut self) -> Self {
        self.notify_on_error = false;
        self
    }
}

/// Errors that can occur while loading the dashboard configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid API URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Process-level settings for talking to the observatory API server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub api_url: String,
    pub poll_interval_ms: u64,
    /// Zero disables the task timeout.
    pub timeout_secs: u64,
    pub show_notifications: bool,
    pub notify_on_error: bool,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            poll_interval_ms: 1000,
            timeout_secs: 0,
            show_notifications: true,
            notify_on_error: true,
            request_timeout_secs: 30,
        }
    }
}

impl DashboardConfig {
    /// Default config file location: `<config_dir>/skyview/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("skyview").join("config.toml"))
    }

    /// Load defaults, then the TOML file, then environment overrides.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |_| {})
    }

    /// Like [`load`](Self::load), with `overrides` applied last. The result
    /// is validated after the overrides, so they can replace bad file or
    /// environment values.
    pub fn load_with<F>(path: Option<&Path>, overrides: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut Self),
    {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded dashboard config");
        Ok(config)
    }

    /// Apply `SKYVIEW_*` overrides from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SKYVIEW_API_URL") {
            self.api_url = url;
        }
        if let Some(raw) = lookup("SKYVIEW_POLL_INTERVAL_MS") {
            self.poll_interval_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "SKYVIEW_POLL_INTERVAL_MS",
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.api_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.api_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.api_url.clone(),
                message: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_ms",
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Runner options for a task with the given label.
    pub fn task_config(&self, label: impl Into<String>) -> TaskConfig {
        TaskConfig {
            label: label.into(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            show_notifications: self.show_notifications,
            notify_on_error: self.notify_on_error,
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }
}
