//! CopyForge - AI-Driven Sales Copy and Ad Generator
//!
//! Generates sales scripts, ad images, objection rebuttals, short video
//! scripts and rendered video ads through a generative-AI backend, with
//! category-aware retry and partial-success batching.
//!
//! ## Core Features
//!
//! - **Error Classification**: structured provider signals first, message
//!   matching only as a fallback
//! - **Retry Controller**: exponential backoff with jitter, retry hints and
//!   cancellation; key reselection on credential failures
//! - **Batch Orchestrator**: concurrent or paced sequential variant fan-out
//! - **Video Poller**: bounded, cancellable long-running operation polling
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use copyforge::{GenerationRequest, MarketingStudio, Tone};
//! use copyforge::ai::{EnvCredentials, NoopKeySelector, ProviderConfig, create_backend};
//!
//! let credentials = Arc::new(EnvCredentials::new("API_KEY"));
//! let backend = create_backend(&ProviderConfig::default(), credentials)?;
//! let studio = MarketingStudio::new(backend, Arc::new(NoopKeySelector));
//!
//! let request = GenerationRequest::new(
//!     "Curso de Ventas",
//!     "Emprendedores",
//!     vec!["Cerrar más ventas".into()],
//!     Tone::Professional,
//! );
//! let script = studio.generate_sales_script(&request).await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: backend abstraction, retry, batching, sanitizer, video polling
//! - [`studio`]: generator operations and prompts
//! - [`config`]: layered configuration
//! - [`types`]: requests, artifacts and the error taxonomy

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod studio;
pub mod types;

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{CopyError, ErrorCategory, ErrorClassifier, Result, ServiceError};

// Requests and Artifacts
pub use types::{
    GeneratedArtifact, GenerationRequest, ImageRequest, MarketingPack, MediaAsset,
    ObjectionRequest, ObjectionResponse, SalesScript, Tone, VideoRequest, VideoScript,
    VideoScriptRequest,
};

// Studio
pub use studio::{MarketingStudio, StudioModels};
