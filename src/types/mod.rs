pub mod artifact;
pub mod error;
pub mod request;

pub use artifact::{
    GeneratedArtifact, InlineMedia, MarketingPack, MediaAsset, MediaKind, ObjectionResponse,
    PostCaption, SalesScript, Scene, StructuredArtifact, VideoScript,
};
pub use error::{CopyError, ErrorCategory, ErrorClassifier, Result, ServiceError};
pub use request::{
    GenerationRequest, ImageRequest, ObjectionRequest, Tone, VideoRequest, VideoScriptRequest,
};
