//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Retry controller constants
pub mod retry {
    /// Maximum attempts per retry-wrapped call (first try included)
    pub const MAX_ATTEMPTS: u32 = 4;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 1_000;

    /// Maximum backoff delay before jitter (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Upper bound of random jitter added to each wait (milliseconds)
    pub const MAX_JITTER_MS: u64 = 500;

    /// Extra attempts allowed for malformed responses
    pub const MALFORMED_RETRIES: u32 = 1;

    /// Per-attempt client-side timeout (seconds)
    pub const ATTEMPT_TIMEOUT_SECS: u64 = 120;

    /// Provider retry hints above this are clamped (seconds)
    pub const MAX_RETRY_HINT_SECS: u64 = 300;
}

/// Batch orchestrator constants
pub mod batch {
    /// Concurrent dispatch in-flight bound
    pub const MAX_IN_FLIGHT: usize = 5;

    /// Pause between sequential dispatches (milliseconds)
    pub const SEQUENTIAL_PAUSE_MS: u64 = 1_000;
}

/// Input sanitizer constants
pub mod sanitizer {
    /// Inputs shorter than this (in characters) skip correction
    pub const MIN_CHARS: usize = 3;

    /// Inputs longer than this are not worth a correction call
    pub const MAX_CHARS: usize = 2_000;
}

/// Video polling constants
pub mod video {
    /// Interval between operation polls (seconds)
    pub const POLL_INTERVAL_SECS: u64 = 10;

    /// Maximum polls before giving up
    pub const MAX_POLLS: u32 = 60;

    pub const DEFAULT_RESOLUTION: &str = "720p";

    pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
}

/// Network constants
pub mod network {
    /// Gemini REST API base
    pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Header carrying the API key
    pub const API_KEY_HEADER: &str = "x-goog-api-key";

    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Primary credential environment variable
    pub const API_KEY_ENV: &str = "API_KEY";

    /// Fallback credential environment variable
    pub const API_KEY_FALLBACK_ENV: &str = "GEMINI_API_KEY";
}

/// Default model identifiers
pub mod models {
    pub const TEXT: &str = "gemini-3-flash-preview";

    pub const IMAGE: &str = "gemini-2.5-flash-image";

    pub const VIDEO: &str = "veo-3.1-fast-generate-preview";

    /// Lightweight model for input correction
    pub const SANITIZER: &str = "gemini-2.5-flash-lite";
}

/// Image generation constants
pub mod image {
    pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

    /// Style instructions appended to every ad image prompt
    pub const STYLE_SUFFIX: &str = "Estilo: Marketing digital moderno, 4k, iluminación cinematográfica, minimalista, exitoso. Sin texto.";
}

/// Output constants
pub mod output {
    /// Default directory for generated media
    pub const DEFAULT_DIR: &str = "copyforge-output";
}
