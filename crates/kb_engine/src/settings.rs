use std::ops::RangeInclusive;
use std::time::Duration;

use kb_core::PROCESSING_PROGRESS;
use rand::Rng;

/// Where the backend listens when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// `None` leaves a hung request outstanding until the backend answers.
    pub request_timeout: Option<Duration>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

impl ApiSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// `{base_url}{path}` with any trailing `/` on the base dropped.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn validate(&self) -> Result<(), url::ParseError> {
        url::Url::parse(self.base_url.trim_end_matches('/')).map(|_| ())
    }

    pub(crate) fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder().connect_timeout(self.connect_timeout);
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

/// Pacing of the perceived-progress heartbeat and the processing phase.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSettings {
    pub heartbeat_interval: Duration,
    /// Upper bound (exclusive) of one random heartbeat step, in percent.
    pub heartbeat_max_step: f32,
    /// The heartbeat never pushes progress past this value.
    pub heartbeat_ceiling: f32,
    pub processing_progress: f32,
    pub processing_delay: Duration,
    /// Chunk counts reported when the backend gives none.
    pub fallback_chunks: RangeInclusive<u32>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(500),
            heartbeat_max_step: 20.0,
            heartbeat_ceiling: 90.0,
            processing_progress: PROCESSING_PROGRESS,
            processing_delay: Duration::from_secs(2),
            fallback_chunks: 10..=59,
        }
    }
}

impl UploadSettings {
    pub(crate) fn random_step(&self) -> f32 {
        if !self.heartbeat_max_step.is_finite() || self.heartbeat_max_step <= 0.0 {
            return 0.0;
        }
        rand::thread_rng().gen_range(0.0..self.heartbeat_max_step)
    }

    pub(crate) fn random_chunk_count(&self) -> u32 {
        if self.fallback_chunks.is_empty() {
            return *self.fallback_chunks.start();
        }
        rand::thread_rng().gen_range(self.fallback_chunks.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub api: ApiSettings,
    pub upload: UploadSettings,
}
