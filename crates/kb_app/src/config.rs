//! Client configuration: an optional RON file, then the environment, then flags.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kb_engine::{ApiSettings, EngineConfig, UploadSettings, DEFAULT_API_BASE_URL};
use kb_logging::LogDestination;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Read from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "kb_client.ron";

/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV: &str = "KB_API_BASE_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("invalid api_base_url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("invalid log_level `{0}`")]
    InvalidLogLevel(String),
    #[error("invalid upload setting: {0}")]
    InvalidUpload(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogTarget {
    File,
    #[default]
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadTuning {
    pub heartbeat_interval_ms: u64,
    pub heartbeat_max_step: f32,
    pub heartbeat_ceiling: f32,
    pub processing_progress: f32,
    pub processing_delay_ms: u64,
    pub fallback_chunks_min: u32,
    pub fallback_chunks_max: u32,
}

impl Default for UploadTuning {
    fn default() -> Self {
        let upload = UploadSettings::default();
        Self {
            heartbeat_interval_ms: millis(upload.heartbeat_interval),
            heartbeat_max_step: upload.heartbeat_max_step,
            heartbeat_ceiling: upload.heartbeat_ceiling,
            processing_progress: upload.processing_progress,
            processing_delay_ms: millis(upload.processing_delay),
            fallback_chunks_min: *upload.fallback_chunks.start(),
            fallback_chunks_max: *upload.fallback_chunks.end(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub connect_timeout_secs: u64,
    /// Unset means requests may wait on the backend indefinitely.
    pub request_timeout_secs: Option<u64>,
    pub upload: UploadTuning,
    pub log_destination: LogTarget,
    pub log_level: String,
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout_secs: ApiSettings::default().connect_timeout.as_secs(),
            request_timeout_secs: None,
            upload: UploadTuning::default(),
            log_destination: LogTarget::default(),
            log_level: "info".to_string(),
            loaded_from: None,
        }
    }
}

impl ClientConfig {
    /// Loads `path`, or [`DEFAULT_CONFIG_FILE`] if it exists. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.loaded_from = Some(path.to_path_buf());
        Ok(config)
    }

    /// File the settings came from; `None` when running on defaults.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    /// Applies the environment and command line overrides, later sources winning.
    pub fn with_overrides(mut self, env_base_url: Option<String>, cli_base_url: Option<String>) -> Self {
        if let Some(url) = env_base_url.filter(|url| !url.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(url) = cli_base_url {
            self.api_base_url = url;
        }
        self
    }

    pub fn with_env_overrides(self, cli_base_url: Option<String>) -> Self {
        self.with_overrides(std::env::var(BASE_URL_ENV).ok(), cli_base_url)
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let api = ApiSettings {
            base_url: self.api_base_url.trim().to_string(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        };
        api.validate().map_err(|err| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason: err.to_string(),
        })?;

        let tuning = &self.upload;
        if tuning.fallback_chunks_min > tuning.fallback_chunks_max {
            return Err(ConfigError::InvalidUpload(format!(
                "fallback_chunks_min {} exceeds fallback_chunks_max {}",
                tuning.fallback_chunks_min, tuning.fallback_chunks_max
            )));
        }
        if !(0.0..=100.0).contains(&tuning.heartbeat_ceiling) {
            return Err(ConfigError::InvalidUpload(
                "heartbeat_ceiling must be within 0..=100".to_string(),
            ));
        }

        let upload = UploadSettings {
            heartbeat_interval: Duration::from_millis(tuning.heartbeat_interval_ms.max(1)),
            heartbeat_max_step: tuning.heartbeat_max_step,
            heartbeat_ceiling: tuning.heartbeat_ceiling,
            processing_progress: tuning.processing_progress,
            processing_delay: Duration::from_millis(tuning.processing_delay_ms),
            fallback_chunks: tuning.fallback_chunks_min..=tuning.fallback_chunks_max,
        };
        Ok(EngineConfig { api, upload })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
