//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides the error classification that drives retry and credential decisions.
//!
//! ## Error Categories
//!
//! - **QuotaExceeded**: Rate/quota limit signaled by the service (wait and retry)
//! - **PermissionDenied**: Credential lacks authorization or billing (reselect key)
//! - **NotFound**: Invalid credential or unknown model (reselect key)
//! - **Transient**: Server-side or network fault (retry with backoff)
//! - **MalformedResponse**: Model reply did not parse into the expected shape (one retry)
//! - **Unknown**: Anything else (fail)
//!
//! ## Classification
//!
//! The machine-readable signal wins: provider status code string first, then
//! HTTP status. Message substring matching is a fallback used only when neither
//! signal is conclusive, and lives behind [`ErrorClassifier`] alone.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Actionable error categories for retry and credential decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Rate or quota limit - wait then retry
    QuotaExceeded,
    /// Credential lacks permission or billing - reselect key, don't retry
    PermissionDenied,
    /// Invalid credential or unknown model - reselect key, don't retry
    NotFound,
    /// Temporary server or network issue - retry with backoff
    Transient,
    /// Response failed to parse or validate - retry once
    MalformedResponse,
    /// Unclassified error - fail
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded => write!(f, "QUOTA_EXCEEDED"),
            Self::PermissionDenied => write!(f, "PERMISSION_DENIED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::MalformedResponse => write!(f, "MALFORMED_RESPONSE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if waiting and trying again can fix this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded | Self::Transient | Self::MalformedResponse
        )
    }

    /// Check if the active credential cannot proceed at all
    pub fn requires_reselection(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::NotFound)
    }

    /// Short user-facing description shown next to the triggering form
    pub fn description(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => {
                "Se alcanzó el límite de uso de la API. Espera un momento e intenta de nuevo."
            }
            Self::PermissionDenied => {
                "Tu clave de API no tiene permiso o facturación para esta función. Selecciona otra clave."
            }
            Self::NotFound => {
                "La clave de API no es válida o el modelo no existe. Selecciona otra clave."
            }
            Self::Transient => {
                "El servicio de IA no está disponible en este momento. Verifica tu conexión e intenta de nuevo."
            }
            Self::MalformedResponse => {
                "La IA devolvió una respuesta incompleta. Intenta de nuevo."
            }
            Self::Unknown => "Ocurrió un error inesperado al generar el contenido.",
        }
    }
}

// =============================================================================
// Service Error
// =============================================================================

/// Structured failure reported by the generative-AI service
#[derive(Debug, Clone)]
pub struct ServiceError {
    /// Error category for routing decisions
    pub category: ErrorCategory,
    /// Provider message (never shown to the user verbatim)
    pub message: String,
    /// HTTP status, when the failure came from an HTTP response
    pub status: Option<u16>,
    /// Provider status code string (e.g. `RESOURCE_EXHAUSTED`)
    pub code: Option<String>,
    /// Suggested wait time before retry (if the provider sent one)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{}:{}] {}", status, self.category, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Create an error with an explicit category
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            status: None,
            code: None,
            retry_after: None,
        }
    }

    /// Create an error from raw provider signals, classifying it once
    pub fn from_signals(status: Option<u16>, code: Option<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let category = ErrorClassifier::classify_signals(status, code.as_deref(), &message);
        Self {
            category,
            message,
            status,
            code,
            retry_after: None,
        }
    }

    /// Network-level failure before any response arrived
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Transient, message)
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Single entry point for mapping failures to categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify any crate error
    pub fn classify(err: &CopyError) -> ErrorCategory {
        match err {
            CopyError::Service(e) => e.category,
            CopyError::RetriesExhausted { category, .. } => *category,
            CopyError::MalformedResponse(_) | CopyError::NoMedia(_) | CopyError::Json(_) => {
                ErrorCategory::MalformedResponse
            }
            CopyError::Timeout { .. } | CopyError::Io(_) => ErrorCategory::Transient,
            CopyError::MissingCredential(_) => ErrorCategory::NotFound,
            CopyError::Cancelled
            | CopyError::BatchFailed { .. }
            | CopyError::Config(_) => ErrorCategory::Unknown,
        }
    }

    /// Classify from raw provider signals: code string, then HTTP status, then message
    pub fn classify_signals(status: Option<u16>, code: Option<&str>, message: &str) -> ErrorCategory {
        code.and_then(Self::classify_code)
            .or_else(|| status.and_then(Self::classify_status))
            .unwrap_or_else(|| Self::classify_message(message))
    }

    /// Classify a provider status code string (gRPC-style or numeric)
    pub fn classify_code(code: &str) -> Option<ErrorCategory> {
        let code = code.trim();
        if let Ok(status) = code.parse::<u16>() {
            return Self::classify_status(status);
        }

        match code.to_ascii_uppercase().as_str() {
            "RESOURCE_EXHAUSTED" | "RATE_LIMIT_EXCEEDED" => Some(ErrorCategory::QuotaExceeded),
            "PERMISSION_DENIED" | "BILLING_DISABLED" | "SERVICE_DISABLED" | "CONSUMER_SUSPENDED" => {
                Some(ErrorCategory::PermissionDenied)
            }
            "NOT_FOUND" | "UNAUTHENTICATED" | "API_KEY_INVALID" | "API_KEY_EXPIRED" => {
                Some(ErrorCategory::NotFound)
            }
            "UNAVAILABLE" | "INTERNAL" | "DEADLINE_EXCEEDED" | "ABORTED" => {
                Some(ErrorCategory::Transient)
            }
            _ => None,
        }
    }

    /// Classify an HTTP status code
    pub fn classify_status(status: u16) -> Option<ErrorCategory> {
        match status {
            429 => Some(ErrorCategory::QuotaExceeded),
            403 => Some(ErrorCategory::PermissionDenied),
            401 | 404 => Some(ErrorCategory::NotFound),
            408 | 500 | 502 | 503 | 504 => Some(ErrorCategory::Transient),
            _ => None,
        }
    }

    /// Fallback: classify from the human-readable message
    ///
    /// Only consulted when no structured signal is conclusive.
    fn classify_message(message: &str) -> ErrorCategory {
        let lower = message.to_lowercase();

        if lower.contains("quota")
            || lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("resource exhausted")
            || lower.contains("resource_exhausted")
        {
            return ErrorCategory::QuotaExceeded;
        }

        if lower.contains("permission")
            || lower.contains("billing")
            || lower.contains("forbidden")
        {
            return ErrorCategory::PermissionDenied;
        }

        if lower.contains("requested entity was not found")
            || lower.contains("api key not valid")
            || lower.contains("invalid api key")
            || lower.contains("not found")
        {
            return ErrorCategory::NotFound;
        }

        if lower.contains("unavailable")
            || lower.contains("overloaded")
            || lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("connection")
            || lower.contains("network")
            || lower.contains("internal error")
        {
            return ErrorCategory::Transient;
        }

        ErrorCategory::Unknown
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reported by the generative-AI service
    #[error("Service error: {0}")]
    Service(ServiceError),

    /// Model reply did not contain a payload of the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Image/video call succeeded but carried no media
    #[error("No media in response: {0}")]
    NoMedia(String),

    #[error("Retries exhausted after {attempts} attempts [{category}]: {message}")]
    RetriesExhausted {
        category: ErrorCategory,
        attempts: u32,
        message: String,
    },

    /// Every variant of a batch failed
    #[error("All {attempted} variants failed; last error: {last_error}")]
    BatchFailed {
        attempted: usize,
        last_error: String,
    },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("No API credential available: {0}")]
    MissingCredential(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<ServiceError> for CopyError {
    fn from(err: ServiceError) -> Self {
        CopyError::Service(err)
    }
}

impl From<reqwest::Error> for CopyError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        CopyError::Service(ServiceError::from_signals(status, None, err.to_string()).or_transient())
    }
}

impl ServiceError {
    /// Transport errors without a conclusive signal are network faults
    fn or_transient(mut self) -> Self {
        if self.category == ErrorCategory::Unknown {
            self.category = ErrorCategory::Transient;
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, CopyError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl CopyError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Category of this error (delegates to [`ErrorClassifier`])
    pub fn category(&self) -> ErrorCategory {
        ErrorClassifier::classify(self)
    }

    /// Provider retry hint, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Service(e) => e.retry_after,
            _ => None,
        }
    }

    /// Short human-readable message for display (no provider codes or payloads)
    pub fn user_message(&self) -> String {
        match self {
            Self::Service(e) => e.category.description().to_string(),
            Self::RetriesExhausted { category, .. } => category.description().to_string(),
            Self::MalformedResponse(_) | Self::NoMedia(_) | Self::Json(_) => {
                ErrorCategory::MalformedResponse.description().to_string()
            }
            Self::BatchFailed { attempted, .. } => format!(
                "No se pudo generar ninguna de las {} variantes. Reintenta.",
                attempted
            ),
            Self::Timeout { .. } => {
                "La operación tardó demasiado. Intenta de nuevo en unos minutos.".to_string()
            }
            Self::Cancelled => "Operación cancelada.".to_string(),
            Self::MissingCredential(_) => {
                "No hay una clave de API seleccionada. Configura una para continuar.".to_string()
            }
            Self::Config(msg) => format!("Configuración inválida: {}", msg),
            Self::Io(e) => format!("Error de archivo: {}", e),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::QuotaExceeded.to_string(), "QUOTA_EXCEEDED");
        assert_eq!(ErrorCategory::NotFound.to_string(), "NOT_FOUND");
        assert_eq!(
            ErrorCategory::MalformedResponse.to_string(),
            "MALFORMED_RESPONSE"
        );
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::QuotaExceeded.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(ErrorCategory::MalformedResponse.is_retryable());
        assert!(!ErrorCategory::PermissionDenied.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Unknown.is_retryable());
    }

    #[test]
    fn test_requires_reselection() {
        assert!(ErrorCategory::PermissionDenied.requires_reselection());
        assert!(ErrorCategory::NotFound.requires_reselection());
        assert!(!ErrorCategory::QuotaExceeded.requires_reselection());
        assert!(!ErrorCategory::Transient.requires_reselection());
    }

    #[test]
    fn test_classify_code_wins_over_status() {
        // 400 alone is ambiguous; the code string decides
        let category =
            ErrorClassifier::classify_signals(Some(400), Some("API_KEY_INVALID"), "bad request");
        assert_eq!(category, ErrorCategory::NotFound);

        let category =
            ErrorClassifier::classify_signals(Some(500), Some("RESOURCE_EXHAUSTED"), "whatever");
        assert_eq!(category, ErrorCategory::QuotaExceeded);
    }

    #[test]
    fn test_classify_error_info_reasons() {
        for reason in ["API_KEY_INVALID", "API_KEY_EXPIRED"] {
            assert_eq!(
                ErrorClassifier::classify_code(reason),
                Some(ErrorCategory::NotFound)
            );
        }
        for reason in ["BILLING_DISABLED", "SERVICE_DISABLED", "CONSUMER_SUSPENDED"] {
            assert_eq!(
                ErrorClassifier::classify_code(reason),
                Some(ErrorCategory::PermissionDenied)
            );
        }
    }

    #[test]
    fn test_classify_quota_signals() {
        assert_eq!(
            ErrorClassifier::classify_code("RESOURCE_EXHAUSTED"),
            Some(ErrorCategory::QuotaExceeded)
        );
        assert_eq!(
            ErrorClassifier::classify_code("429"),
            Some(ErrorCategory::QuotaExceeded)
        );
        assert_eq!(
            ErrorClassifier::classify_status(429),
            Some(ErrorCategory::QuotaExceeded)
        );
    }

    #[test]
    fn test_classify_http_status() {
        assert_eq!(
            ErrorClassifier::classify_status(403),
            Some(ErrorCategory::PermissionDenied)
        );
        assert_eq!(
            ErrorClassifier::classify_status(404),
            Some(ErrorCategory::NotFound)
        );
        assert_eq!(
            ErrorClassifier::classify_status(503),
            Some(ErrorCategory::Transient)
        );
        assert_eq!(ErrorClassifier::classify_status(400), None);
    }

    #[test]
    fn test_structured_signal_ignores_message_wording() {
        // Message says "not found" but the status says quota
        let category =
            ErrorClassifier::classify_signals(Some(429), None, "Requested entity was not found.");
        assert_eq!(category, ErrorCategory::QuotaExceeded);
    }

    #[test]
    fn test_message_fallback() {
        let category =
            ErrorClassifier::classify_signals(None, None, "Requested entity was not found.");
        assert_eq!(category, ErrorCategory::NotFound);

        let category = ErrorClassifier::classify_signals(None, None, "You exceeded your current quota");
        assert_eq!(category, ErrorCategory::QuotaExceeded);

        let category = ErrorClassifier::classify_signals(None, None, "Something weird happened");
        assert_eq!(category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_classify_copy_errors() {
        assert_eq!(
            CopyError::malformed("no braces").category(),
            ErrorCategory::MalformedResponse
        );
        assert_eq!(
            CopyError::timeout("generate", Duration::from_secs(1)).category(),
            ErrorCategory::Transient
        );
        assert_eq!(
            CopyError::MissingCredential("API_KEY".into()).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(CopyError::Cancelled.category(), ErrorCategory::Unknown);
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::from_signals(Some(429), Some("RESOURCE_EXHAUSTED".into()), "slow down");
        assert_eq!(err.to_string(), "[429:QUOTA_EXCEEDED] slow down");

        let err = ServiceError::transport("connection reset");
        assert_eq!(err.to_string(), "[TRANSIENT] connection reset");
    }

    #[test]
    fn test_user_message_hides_provider_detail() {
        let err = CopyError::from(ServiceError::from_signals(
            Some(403),
            Some("PERMISSION_DENIED".into()),
            "Caller does not have permission {\"raw\": true}",
        ));
        let message = err.user_message();
        assert!(!message.contains("raw"));
        assert!(!message.contains("403"));
        assert_eq!(message, ErrorCategory::PermissionDenied.description());
    }
}
