use std::path::PathBuf;
use std::time::Duration;

use manga_core::RetryPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::{FetchSettings, DEFAULT_USER_AGENT};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("max_retries must be at least 1")]
    ZeroRetries,
    #[error("user_agent must not be blank")]
    EmptyUserAgent,
    #[error("output_dir must not be empty")]
    EmptyOutputDir,
}

/// Settings for one download run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Text file with one source URL per line.
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    /// Worker pool size; also bounds concurrent discovery.
    pub max_concurrency: usize,
    /// Minimum gap between request starts to one host.
    pub per_host_delay_ms: u64,
    /// Total attempts for a page that keeps failing transiently.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Overrides the built-in browser-like user agent.
    pub user_agent: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_image_bytes: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("urls.txt"),
            output_dir: PathBuf::from("output"),
            max_concurrency: 4,
            per_host_delay_ms: 500,
            max_retries: 3,
            retry_base_delay_ms: 500,
            user_agent: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self
            .user_agent
            .as_deref()
            .is_some_and(|agent| agent.trim().is_empty())
        {
            return Err(ConfigError::EmptyUserAgent);
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }
        Ok(())
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_image_bytes,
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            ..FetchSettings::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn per_host_delay(&self) -> Duration {
        Duration::from_millis(self.per_host_delay_ms)
    }
}
