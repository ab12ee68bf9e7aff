//! AI Integration Layer
//!
//! Resilient orchestration around a generative-AI backend: payload
//! extraction, retry, batching, input correction and video polling.

pub mod batch;
pub mod credentials;
pub mod extract;
pub mod provider;
pub mod retry;
pub mod sanitizer;
pub mod schema;
pub mod timeout;
pub mod video;

pub use batch::{
    BatchOrchestrator, BatchProgress, BatchResult, DispatchMode, ProgressCallback, Variant,
};
pub use credentials::{
    ConsoleKeySelector, CredentialSource, EnvCredentials, KeySelector, KeySlot, NoopKeySelector,
    SharedCredentials, SharedKeySelector, ensure_key_selected,
};
pub use extract::{extract_payload, parse_artifact};
pub use provider::{
    GeminiBackend, GenerativeBackend, ProviderConfig, SharedBackend, create_backend,
};
pub use retry::{RetryController, RetryPolicy, RetryState};
pub use sanitizer::InputSanitizer;
pub use schema::{Field, FieldType, ResponseSchema};
pub use timeout::with_timeout;
pub use video::{PollState, VideoOperation, VideoPoller};
