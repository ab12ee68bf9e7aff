//! Input Sanitizer
//!
//! Best-effort spelling/grammar/tone correction of short free-text input before
//! it is embedded in a prompt. Runs on a lightweight model and never raises:
//! any failure or cancellation hands back the original text.

use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ai::extract::parse_artifact;
use crate::ai::provider::SharedBackend;
use crate::ai::schema::{Field, ResponseSchema};
use crate::ai::timeout::with_timeout;
use crate::constants::sanitizer as sanitizer_constants;
use crate::types::{CopyError, Result, StructuredArtifact};

#[derive(Debug, Deserialize)]
struct CorrectedText {
    corrected: String,
}

impl StructuredArtifact for CorrectedText {
    const KIND: &'static str = "corrected_text";

    fn schema() -> ResponseSchema {
        ResponseSchema::object(vec![Field::string(
            "corrected",
            "El texto corregido, sin comentarios adicionales.",
        )])
    }

    fn validate(&self) -> Result<()> {
        if self.corrected.trim().is_empty() {
            return Err(CopyError::malformed("corrected_text: empty correction"));
        }
        Ok(())
    }
}

/// Optional correction pass for free-text fields
#[derive(Clone)]
pub struct InputSanitizer {
    backend: SharedBackend,
    model: String,
    min_chars: usize,
    max_chars: usize,
    timeout: Duration,
    enabled: bool,
    cancel: CancellationToken,
}

impl InputSanitizer {
    pub fn new(backend: SharedBackend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            min_chars: sanitizer_constants::MIN_CHARS,
            max_chars: sanitizer_constants::MAX_CHARS,
            timeout: Duration::from_secs(30),
            enabled: true,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether `text` would be sent for correction
    pub fn should_correct(&self, text: &str) -> bool {
        let len = text.trim().chars().count();
        self.enabled && len >= self.min_chars && len <= self.max_chars
    }

    /// Corrected text, or `text` unchanged on bypass or any failure
    pub async fn sanitize(&self, text: &str) -> String {
        if !self.should_correct(text) {
            return text.to_string();
        }

        match self.correct(text).await {
            Ok(corrected) => {
                if corrected != text {
                    debug!(original_chars = text.len(), corrected_chars = corrected.len(), "Input corrected");
                }
                corrected
            }
            Err(e) => {
                warn!(error = %e, "Input correction failed, using original text");
                text.to_string()
            }
        }
    }

    async fn correct(&self, text: &str) -> Result<String> {
        let prompt = format!(
            "Corrige la ortografía, la gramática y el tono del siguiente texto sin cambiar su \
             significado ni añadir información. Si ya es correcto, devuélvelo igual.\n\nTexto: {}",
            text.trim()
        );

        let schema = CorrectedText::schema();
        let raw = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(CopyError::Cancelled),
            raw = with_timeout(
                self.timeout,
                self.backend
                    .generate_structured(&self.model, &prompt, &schema),
                "input correction",
            ) => raw?,
        };

        let parsed: CorrectedText = parse_artifact(&raw)?;
        Ok(parsed.corrected.trim().to_string())
    }
}
