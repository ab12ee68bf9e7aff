//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/copyforge/) and project (.copyforge/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::batch::DispatchMode;
use crate::ai::provider::ProviderConfig;
use crate::ai::retry::RetryPolicy;
use crate::ai::video::VideoPoller;
use crate::constants::{
    batch as batch_constants, models, network as net_constants, output as output_constants,
    retry as retry_constants, sanitizer as sanitizer_constants, video as video_constants,
};
use crate::types::{CopyError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Generative backend settings
    pub ai: AiConfig,

    /// Retry controller settings
    pub retry: RetryConfig,

    /// Batch dispatch settings
    pub batch: BatchConfig,

    /// Input correction settings
    pub sanitizer: SanitizerConfig,

    /// Video polling settings
    pub video: VideoConfig,

    /// Generated media output
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            ai: AiConfig::default(),
            retry: RetryConfig::default(),
            batch: BatchConfig::default(),
            sanitizer: SanitizerConfig::default(),
            video: VideoConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `CopyError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.ai.api_base).map_err(|e| {
            CopyError::Config(format!("ai.api_base is not a valid URL ({}): {}", self.ai.api_base, e))
        })?;

        if self.ai.timeout_secs == 0 {
            return Err(CopyError::Config(
                "ai.timeout_secs must be greater than 0".to_string(),
            ));
        }

        for (key, model) in [
            ("ai.text_model", &self.ai.text_model),
            ("ai.image_model", &self.ai.image_model),
            ("ai.video_model", &self.ai.video_model),
            ("ai.sanitizer_model", &self.ai.sanitizer_model),
        ] {
            if model.trim().is_empty() {
                return Err(CopyError::Config(format!("{} must not be empty", key)));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(CopyError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if Duration::from_millis(self.retry.base_delay_ms)
            > Duration::from_secs(self.retry.max_delay_secs)
        {
            return Err(CopyError::Config(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_secs ({})",
                self.retry.base_delay_ms, self.retry.max_delay_secs
            )));
        }

        if self.batch.mode == BatchMode::Concurrent && self.batch.max_in_flight == 0 {
            return Err(CopyError::Config(
                "batch.max_in_flight must be at least 1 in concurrent mode".to_string(),
            ));
        }

        if self.video.poll_interval_secs == 0 || self.video.max_polls == 0 {
            return Err(CopyError::Config(
                "video.poll_interval_secs and video.max_polls must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// AI Backend Configuration
// =============================================================================

/// Generative backend settings
///
/// Note: an API key set here is never serialized and is redacted in debug
/// output. Environment variables are preferred.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Backend type: "gemini"
    pub provider: String,

    /// API base URL
    pub api_base: String,

    /// Model for structured text (scripts, objections, captions)
    pub text_model: String,

    /// Model for ad images
    pub image_model: String,

    /// Model for video ads
    pub video_model: String,

    /// Lightweight model for input correction
    pub sanitizer_model: String,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,

    /// HTTP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Fallback environment variable
    pub api_key_fallback_env: String,

    /// Inline API key (never serialized)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("provider", &self.provider)
            .field("api_base", &self.api_base)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("video_model", &self.video_model)
            .field("sanitizer_model", &self.sanitizer_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_base: net_constants::DEFAULT_API_BASE.to_string(),
            text_model: models::TEXT.to_string(),
            image_model: models::IMAGE.to_string(),
            video_model: models::VIDEO.to_string(),
            sanitizer_model: models::SANITIZER.to_string(),
            timeout_secs: net_constants::DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: net_constants::CONNECTION_TIMEOUT_SECS,
            api_key_env: net_constants::API_KEY_ENV.to_string(),
            api_key_fallback_env: net_constants::API_KEY_FALLBACK_ENV.to_string(),
            api_key: None,
        }
    }
}

impl AiConfig {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider.clone(),
            api_base: self.api_base.clone(),
            timeout_secs: self.timeout_secs,
            connect_timeout_secs: self.connect_timeout_secs,
        }
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, first try included
    pub max_attempts: u32,

    pub base_delay_ms: u64,

    pub max_delay_secs: u64,

    pub max_jitter_ms: u64,

    /// Extra attempts for malformed responses
    pub malformed_retries: u32,

    /// Client-side bound per attempt (0 disables)
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: retry_constants::MAX_ATTEMPTS,
            base_delay_ms: retry_constants::BASE_DELAY_MS,
            max_delay_secs: retry_constants::MAX_DELAY_SECS,
            max_jitter_ms: retry_constants::MAX_JITTER_MS,
            malformed_retries: retry_constants::MALFORMED_RETRIES,
            attempt_timeout_secs: retry_constants::ATTEMPT_TIMEOUT_SECS,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_secs(self.max_delay_secs),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
            malformed_retries: self.malformed_retries,
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
        }
    }
}

// =============================================================================
// Batch Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Bounded parallel dispatch
    Concurrent,
    /// One request at a time with a pause (kind to tight image quotas)
    #[default]
    Sequential,
}

impl std::fmt::Display for BatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchMode::Concurrent => write!(f, "concurrent"),
            BatchMode::Sequential => write!(f, "sequential"),
        }
    }
}

impl std::str::FromStr for BatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "concurrent" => Ok(BatchMode::Concurrent),
            "sequential" => Ok(BatchMode::Sequential),
            _ => Err(format!(
                "Unknown batch mode: {}. Valid values: concurrent, sequential",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub mode: BatchMode,

    /// In-flight bound for concurrent mode
    pub max_in_flight: usize,

    /// Pause between requests in sequential mode (milliseconds)
    pub pause_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            mode: BatchMode::default(),
            max_in_flight: batch_constants::MAX_IN_FLIGHT,
            pause_ms: batch_constants::SEQUENTIAL_PAUSE_MS,
        }
    }
}

impl BatchConfig {
    pub fn dispatch_mode(&self) -> DispatchMode {
        match self.mode {
            BatchMode::Concurrent => DispatchMode::Concurrent {
                max_in_flight: self.max_in_flight.max(1),
            },
            BatchMode::Sequential => DispatchMode::Sequential {
                pause: Duration::from_millis(self.pause_ms),
            },
        }
    }
}

// =============================================================================
// Sanitizer, Video and Output
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub enabled: bool,

    /// Inputs shorter than this many characters skip correction
    pub min_chars: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_chars: sanitizer_constants::MIN_CHARS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub poll_interval_secs: u64,

    pub max_polls: u32,

    pub resolution: String,

    pub aspect_ratio: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: video_constants::POLL_INTERVAL_SECS,
            max_polls: video_constants::MAX_POLLS,
            resolution: video_constants::DEFAULT_RESOLUTION.to_string(),
            aspect_ratio: video_constants::DEFAULT_ASPECT_RATIO.to_string(),
        }
    }
}

impl VideoConfig {
    pub fn poller(&self) -> VideoPoller {
        VideoPoller::new(Duration::from_secs(self.poll_interval_secs), self.max_polls)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for generated images and videos
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(output_constants::DEFAULT_DIR),
        }
    }
}
