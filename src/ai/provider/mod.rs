//! Generative Backend Abstraction
//!
//! Defines the `GenerativeBackend` trait for the three operation shapes the
//! studio needs: structured text, single images and long-running video.
//!
//! ## Modules
//!
//! - `gemini`: Gemini / Veo REST implementation

mod gemini;
#[cfg(test)]
pub(crate) mod mock;

pub use gemini::GeminiBackend;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::credentials::SharedCredentials;
use crate::ai::schema::ResponseSchema;
use crate::ai::video::VideoOperation;
use crate::constants::network as net_constants;
use crate::types::{CopyError, ImageRequest, InlineMedia, Result, VideoRequest};

// =============================================================================
// Backend Trait
// =============================================================================

/// Capability surface of a generative-AI service
///
/// Implementations read the credential at call time and report failures as
/// classified `ServiceError`s. They never retry; that is the caller's job.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Generate text constrained to `schema`; returns the raw model text
    async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String>;

    /// Generate at most one inline image
    ///
    /// `Ok(None)` means the call succeeded but no part carried image data.
    async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
        request: &ImageRequest,
    ) -> Result<Option<InlineMedia>>;

    /// Start a long-running video generation
    async fn start_video(
        &self,
        model: &str,
        prompt: &str,
        request: &VideoRequest,
    ) -> Result<VideoOperation>;

    /// Refresh an operation handle
    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation>;

    /// Fetch a finished video
    async fn download_video(&self, uri: &str) -> Result<InlineMedia>;
}

/// Shared backend for concurrent access across batch variants
pub type SharedBackend = Arc<dyn GenerativeBackend>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Connection settings for a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend type: "gemini"
    pub provider: String,
    /// API base URL
    pub api_base: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// HTTP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_base: net_constants::DEFAULT_API_BASE.to_string(),
            timeout_secs: net_constants::DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: net_constants::CONNECTION_TIMEOUT_SECS,
        }
    }
}

/// Create a shared backend from configuration
pub fn create_backend(
    config: &ProviderConfig,
    credentials: SharedCredentials,
) -> Result<SharedBackend> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiBackend::new(config, credentials)?)),
        _ => Err(CopyError::Config(format!(
            "Unknown provider: {}. Supported: gemini",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::credentials::EnvCredentials;

    #[test]
    fn test_create_backend_rejects_unknown() {
        let config = ProviderConfig {
            provider: "openai".into(),
            ..Default::default()
        };
        let result = create_backend(&config, Arc::new(EnvCredentials::new("UNUSED_KEY")));
        assert!(matches!(result, Err(CopyError::Config(_))));
    }

    #[test]
    fn test_create_gemini_backend() {
        let backend = create_backend(
            &ProviderConfig::default(),
            Arc::new(EnvCredentials::new("UNUSED_KEY")),
        )
        .unwrap();
        assert_eq!(backend.name(), "gemini");
    }
}
