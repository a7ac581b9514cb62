//! OpenProject connection and work-item configuration.
//!
//! # Responsibility
//! - Load connection settings from JSON and environment overrides.
//! - Carry the project/type identifiers used when creating tasks and features.
//! - Derive API URLs and link hrefs from one place.
//!
//! # Invariants
//! - `host` is an absolute `http(s)` URL without trailing slash after `validate()`.
//! - Work-item identifiers are checked by the operation that needs them, not here.

use crate::poll::{PollPolicy, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `host`.
pub const ENV_HOST: &str = "OPEN_PROJECT_HOST";
/// Environment variable overriding `access_token`.
pub const ENV_TOKEN: &str = "OPEN_PROJECT_TOKEN";

const DEFAULT_HOST: &str = "https://openproject.local";
const DEFAULT_API_PREFIX: &str = "/api/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = DEFAULT_POLL_INTERVAL.as_millis() as u64;

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid config `{field}`: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Identifiers of the projects/types that receive created work items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkItemSettings {
    /// Target project for tasks created from task blocks.
    pub task_project_id: String,
    /// Work-package type used for tasks.
    pub task_type_id: String,
    /// Target project for features.
    pub feature_project_id: String,
    /// Work-package type used for features.
    pub feature_type_id: String,
    /// Status assigned to newly created features.
    pub default_status_id: String,
}

impl Default for WorkItemSettings {
    fn default() -> Self {
        Self {
            task_project_id: "1".to_string(),
            task_type_id: "1".to_string(),
            feature_project_id: "1".to_string(),
            feature_type_id: "4".to_string(),
            default_status_id: "1".to_string(),
        }
    }
}

/// Full client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenProjectConfig {
    pub host: String,
    pub api_prefix: String,
    /// Bearer token; requests are sent unauthenticated when absent.
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    pub work_items: WorkItemSettings,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
}

impl Default for OpenProjectConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            access_token: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            work_items: WorkItemSettings::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

impl OpenProjectConfig {
    /// Parses config JSON; missing fields fall back to defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads config from a JSON file, applies environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Builds config from defaults plus environment overrides only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Applies `OPEN_PROJECT_HOST` / `OPEN_PROJECT_TOKEN` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup; blank values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup(ENV_HOST).filter(|value| !value.trim().is_empty()) {
            self.host = host.trim().to_string();
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|value| !value.trim().is_empty()) {
            self.access_token = Some(token.trim().to_string());
        }
    }

    /// Normalizes and validates transport settings.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let host = self.host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(invalid(
                "host",
                format!("must be an absolute http(s) url, got `{host}`"),
            ));
        }
        self.host = host.to_string();

        let prefix = self.api_prefix.trim().trim_end_matches('/');
        self.api_prefix = if prefix.is_empty() || prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{prefix}")
        };

        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be greater than zero"));
        }
        if self.poll_max_attempts == 0 {
            return Err(invalid("poll_max_attempts", "must be greater than zero"));
        }
        Ok(())
    }

    /// Absolute URL of one API path such as `/work_packages/7`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.host, self.api_prefix, path)
    }

    /// Server-relative href of an API resource, as used inside `_links`.
    pub fn api_href(&self, path: &str) -> String {
        format!("{}{}", self.api_prefix, path)
    }

    pub fn type_href(&self, type_id: &str) -> String {
        self.api_href(&format!("/types/{type_id}"))
    }

    pub fn status_href(&self, status_id: &str) -> String {
        self.api_href(&format!("/statuses/{status_id}"))
    }

    pub fn work_package_href(&self, id: &str) -> String {
        self.api_href(&format!("/work_packages/{id}"))
    }

    /// Browser URL of a work package.
    pub fn work_package_url(&self, id: &str) -> String {
        format!("{}/wp/{id}", self.host)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.poll_max_attempts,
        )
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
