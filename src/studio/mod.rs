//! Marketing Studio
//!
//! Facade over the generative backend that turns marketing requests into
//! validated artifacts. Every backend call goes through the retry controller;
//! batch operations fan out through the batch orchestrator.
//!
//! ## Features
//!
//! - **Single Artifacts**: sales scripts, ad images, objection rebuttals,
//!   video scripts and rendered video ads
//! - **Variant Batches**: persuasion-angle script batches and five-style image
//!   or marketing-pack batches with partial success
//! - **Input Correction**: free-text fields are corrected once, before any
//!   fan-out
//! - **Cancellation**: one token shared by retry waits, batch dispatch and
//!   video polling

pub mod prompts;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::ai::batch::{BatchOrchestrator, BatchResult, DispatchMode, ProgressCallback, Variant};
use crate::ai::credentials::SharedKeySelector;
use crate::ai::extract::parse_artifact;
use crate::ai::provider::SharedBackend;
use crate::ai::retry::{RetryController, RetryPolicy};
use crate::ai::sanitizer::InputSanitizer;
use crate::ai::video::VideoPoller;
use crate::config::Config;
use crate::constants::models;
use crate::types::{
    CopyError, GenerationRequest, ImageRequest, MarketingPack, MediaAsset, MediaKind,
    ObjectionRequest, ObjectionResponse, PostCaption, Result, SalesScript, StructuredArtifact,
    VideoRequest, VideoScript, VideoScriptRequest,
};

/// Model names per operation shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioModels {
    pub text: String,
    pub image: String,
    pub video: String,
}

impl Default for StudioModels {
    fn default() -> Self {
        Self {
            text: models::TEXT.to_string(),
            image: models::IMAGE.to_string(),
            video: models::VIDEO.to_string(),
        }
    }
}

/// Generator operations over one backend
#[derive(Clone)]
pub struct MarketingStudio {
    backend: SharedBackend,
    retry: RetryController,
    dispatch: DispatchMode,
    progress: Option<ProgressCallback>,
    sanitizer: InputSanitizer,
    poller: VideoPoller,
    models: StudioModels,
    cancel: CancellationToken,
}

impl MarketingStudio {
    pub fn new(backend: SharedBackend, selector: SharedKeySelector) -> Self {
        Self {
            sanitizer: InputSanitizer::new(backend.clone(), models::SANITIZER),
            retry: RetryController::new(RetryPolicy::default(), selector),
            backend,
            dispatch: DispatchMode::default(),
            progress: None,
            poller: VideoPoller::default(),
            models: StudioModels::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Studio with every knob taken from `config`
    pub fn from_config(config: &Config, backend: SharedBackend, selector: SharedKeySelector) -> Self {
        let sanitizer = InputSanitizer::new(backend.clone(), config.ai.sanitizer_model.clone())
            .with_enabled(config.sanitizer.enabled)
            .with_min_chars(config.sanitizer.min_chars);

        Self::new(backend, selector)
            .with_retry_policy(config.retry.policy())
            .with_dispatch(config.batch.dispatch_mode())
            .with_sanitizer(sanitizer)
            .with_poller(config.video.poller())
            .with_models(StudioModels {
                text: config.ai.text_model.clone(),
                image: config.ai.image_model.clone(),
                video: config.ai.video_model.clone(),
            })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = self.retry.with_policy(policy);
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: InputSanitizer) -> Self {
        self.sanitizer = sanitizer.with_cancel(self.cancel.clone());
        self
    }

    pub fn with_poller(mut self, poller: VideoPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn with_models(mut self, models: StudioModels) -> Self {
        self.models = models;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.sanitizer = self.sanitizer.with_cancel(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Token that aborts in-flight work when cancelled
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn batch(&self) -> BatchOrchestrator {
        let orchestrator = BatchOrchestrator::new(self.retry.clone(), self.dispatch);
        match &self.progress {
            Some(callback) => orchestrator.with_progress(Arc::clone(callback)),
            None => orchestrator,
        }
    }

    // =========================================================================
    // Sales Copy
    // =========================================================================

    #[instrument(skip_all, fields(product = %request.product_name, tone = %request.tone))]
    pub async fn generate_sales_script(&self, request: &GenerationRequest) -> Result<SalesScript> {
        let request = self.sanitize_request(request).await;
        let prompt = prompts::sales_script(&request, None);

        self.retry
            .execute("sales_script", &self.cancel, || {
                self.structured_attempt::<SalesScript>(&prompt)
            })
            .await
    }

    /// One script per persuasion angle
    #[instrument(skip_all, fields(product = %request.product_name, variants = variants.len()))]
    pub async fn generate_script_variants(
        &self,
        request: &GenerationRequest,
        variants: Vec<Variant>,
    ) -> Result<BatchResult<SalesScript>> {
        let request = self.sanitize_request(request).await;

        self.batch()
            .run("script_variants", variants, &self.cancel, |variant| {
                let prompt = prompts::sales_script(&request, Some(variant));
                async move { self.structured_attempt::<SalesScript>(&prompt).await }
            })
            .await
    }

    #[instrument(skip_all)]
    pub async fn handle_objection(&self, request: &ObjectionRequest) -> Result<ObjectionResponse> {
        let request = ObjectionRequest {
            objection: self.sanitizer.sanitize(&request.objection).await,
            context: request.context.clone(),
        };
        let prompt = prompts::objection(&request);

        self.retry
            .execute("objection", &self.cancel, || {
                self.structured_attempt::<ObjectionResponse>(&prompt)
            })
            .await
    }

    #[instrument(skip_all, fields(product = %request.product))]
    pub async fn generate_video_script(&self, request: &VideoScriptRequest) -> Result<VideoScript> {
        let request = VideoScriptRequest {
            product: request.product.clone(),
            goal: self.sanitizer.sanitize(&request.goal).await,
        };
        let prompt = prompts::video_script(&request);

        self.retry
            .execute("video_script", &self.cancel, || {
                self.structured_attempt::<VideoScript>(&prompt)
            })
            .await
    }

    // =========================================================================
    // Images and Packs
    // =========================================================================

    #[instrument(skip_all, fields(reference = request.reference.is_some()))]
    pub async fn generate_image(&self, request: &ImageRequest) -> Result<MediaAsset> {
        let mut request = request.clone();
        request.description = self.sanitizer.sanitize(&request.description).await;
        let prompt = prompts::ad_image(&request.description);

        self.retry
            .execute("image", &self.cancel, || self.image_attempt(&prompt, &request))
            .await
    }

    /// One image per ad style
    #[instrument(skip_all)]
    pub async fn generate_image_variants(&self, description: &str) -> Result<BatchResult<MediaAsset>> {
        let base = self.sanitizer.sanitize(description).await;

        self.batch()
            .run("image_variants", Variant::image_styles(), &self.cancel, |variant| {
                let request = ImageRequest::new(variant.apply(&base));
                let prompt = prompts::ad_image(&request.description);
                async move { self.image_attempt(&prompt, &request).await }
            })
            .await
    }

    /// Ad image plus matching social post text
    #[instrument(skip_all)]
    pub async fn generate_marketing_pack(&self, description: &str) -> Result<MarketingPack> {
        let description = self.sanitizer.sanitize(description).await;

        self.retry
            .execute("marketing_pack", &self.cancel, || self.pack_attempt(&description))
            .await
    }

    /// One marketing pack per ad style
    #[instrument(skip_all)]
    pub async fn generate_marketing_packs(
        &self,
        description: &str,
    ) -> Result<BatchResult<MarketingPack>> {
        let base = self.sanitizer.sanitize(description).await;

        self.batch()
            .run("marketing_packs", Variant::image_styles(), &self.cancel, |variant| {
                let description = variant.apply(&base);
                async move { self.pack_attempt(&description).await }
            })
            .await
    }

    // =========================================================================
    // Video
    // =========================================================================

    /// Start, poll and download a rendered video ad
    #[instrument(skip_all, fields(product = %request.product, resolution = %request.resolution))]
    pub async fn generate_marketing_video(&self, request: &VideoRequest) -> Result<MediaAsset> {
        let prompt = prompts::marketing_video(&request.product);
        let backend = self.backend.as_ref();

        let operation = self
            .retry
            .execute("video_start", &self.cancel, || {
                backend.start_video(&self.models.video, &prompt, request)
            })
            .await?;

        let uri = self
            .poller
            .wait(backend, &self.retry, operation, &self.cancel)
            .await?;

        let media = self
            .retry
            .execute("video_download", &self.cancel, || backend.download_video(&uri))
            .await?;

        debug!(bytes = media.data.len(), "Video asset ready");
        Ok(MediaAsset::new(MediaKind::Video, media))
    }

    // =========================================================================
    // Attempts (one backend round-trip each, no retry)
    // =========================================================================

    async fn structured_attempt<T: StructuredArtifact>(&self, prompt: &str) -> Result<T> {
        let raw = self
            .backend
            .generate_structured(&self.models.text, prompt, &T::schema())
            .await?;
        parse_artifact(&raw)
    }

    async fn image_attempt(&self, prompt: &str, request: &ImageRequest) -> Result<MediaAsset> {
        let media = self
            .backend
            .generate_image(&self.models.image, prompt, request)
            .await?
            .ok_or_else(|| CopyError::NoMedia(format!("no image for '{}'", request.description)))?;
        Ok(MediaAsset::new(MediaKind::Image, media))
    }

    async fn pack_attempt(&self, description: &str) -> Result<MarketingPack> {
        let request = ImageRequest::new(description);
        let image_prompt = prompts::ad_image(description);
        let caption_prompt = prompts::post_caption(description);

        let (image, caption) = tokio::try_join!(
            self.image_attempt(&image_prompt, &request),
            self.structured_attempt::<PostCaption>(&caption_prompt),
        )?;
        Ok(MarketingPack::new(&image, caption))
    }

    async fn sanitize_request(&self, request: &GenerationRequest) -> GenerationRequest {
        let mut request = request.clone();
        request.target_audience = self.sanitizer.sanitize(&request.target_audience).await;
        if let Some(context) = request.context.take() {
            request.context = Some(self.sanitizer.sanitize(&context).await);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::credentials::{KeySelector, NoopKeySelector};
    use crate::ai::provider::mock::MockBackend;
    use crate::ai::video::VideoOperation;
    use crate::types::{ErrorCategory, InlineMedia, ServiceError, Tone};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const SCRIPT_JSON: &str = r#"Aquí tienes tu guion:
{"headline": "Vende el doble este trimestre", "body": "Un método probado paso a paso.", "cta": "Inscríbete hoy"}
¡Éxito!"#;

    fn studio(backend: Arc<MockBackend>) -> MarketingStudio {
        MarketingStudio::new(backend.clone(), Arc::new(NoopKeySelector))
            .with_retry_policy(
                RetryPolicy::default()
                    .with_base_delay(Duration::from_millis(1))
                    .with_jitter(Duration::ZERO),
            )
            .with_dispatch(DispatchMode::Concurrent { max_in_flight: 5 })
            .with_sanitizer(InputSanitizer::new(backend, "lite").with_enabled(false))
            .with_poller(VideoPoller::new(Duration::from_millis(1), 5))
    }

    fn png() -> Option<InlineMedia> {
        Some(InlineMedia::new("image/png", vec![0x89, 0x50, 0x4e, 0x47]))
    }

    fn unknown(message: &str) -> CopyError {
        ServiceError::new(ErrorCategory::Unknown, message).into()
    }

    #[tokio::test]
    async fn test_curso_de_ventas_script() {
        let backend = Arc::new(MockBackend::new().with_text(|_| Ok(SCRIPT_JSON.to_string())));
        let request = GenerationRequest::new(
            "Curso de Ventas",
            "Emprendedores",
            vec!["Cerrar más ventas".into(), "Negociar mejor".into()],
            Tone::Professional,
        );

        let script = studio(backend.clone())
            .generate_sales_script(&request)
            .await
            .unwrap();

        assert!(!script.headline.trim().is_empty());
        assert!(!script.body.trim().is_empty());
        assert!(!script.cta.trim().is_empty());
        assert!(backend.recorded_prompts()[0].contains("Producto: Curso de Ventas"));
    }

    #[tokio::test]
    async fn test_malformed_script_retried_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let backend = Arc::new(MockBackend::new().with_text(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(r#"{"headline": "Solo titular"}"#.to_string())
            } else {
                Ok(SCRIPT_JSON.to_string())
            }
        }));
        let request = GenerationRequest::new("Curso", "Todos", vec![], Tone::Humorous);

        assert!(studio(backend).generate_sales_script(&request).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_image_variants_partial_success() {
        let backend = Arc::new(MockBackend::new().with_image(|prompt| {
            if prompt.contains("limpio") || prompt.contains("tecnológico") {
                Err(unknown("blocked"))
            } else {
                Ok(png())
            }
        }));

        let result = studio(backend.clone())
            .generate_image_variants("Agencia inmobiliaria")
            .await
            .unwrap();

        assert_eq!(result.attempted(), 5);
        assert_eq!(result.succeeded(), 3);
        let labels: Vec<_> = result.successes().iter().map(|(v, _)| v.label.as_str()).collect();
        assert_eq!(labels, vec!["corporate", "dynamic", "human"]);
        assert_eq!(backend.image_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_image_variants_all_failed() {
        let backend = Arc::new(MockBackend::new().with_image(|_| Err(unknown("down"))));

        let err = studio(backend)
            .generate_image_variants("Agencia inmobiliaria")
            .await
            .unwrap_err();

        assert!(matches!(err, CopyError::BatchFailed { attempted: 5, .. }));
    }

    #[tokio::test]
    async fn test_image_without_media_is_malformed() {
        let backend = Arc::new(MockBackend::new().with_image(|_| Ok(None)));

        let err = studio(backend.clone())
            .generate_image(&ImageRequest::new("Café de especialidad"))
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::MalformedResponse);
        assert_eq!(backend.image_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_marketing_pack_combines_image_and_caption() {
        let backend = Arc::new(
            MockBackend::new()
                .with_image(|_| Ok(png()))
                .with_text(|_| Ok(r#"{"postText": "¡Nuevo café! #cafe #barista #mañana"}"#.to_string())),
        );

        let pack = studio(backend)
            .generate_marketing_pack("Café de especialidad")
            .await
            .unwrap();

        assert!(pack.post_text.contains("#cafe"));
        assert_eq!(pack.image_media().unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_marketing_packs_batch() {
        let backend = Arc::new(
            MockBackend::new()
                .with_image(|_| Ok(png()))
                .with_text(|prompt| {
                    if prompt.contains("corporativo") {
                        Err(unknown("caption failed"))
                    } else {
                        Ok(r#"{"postText": "Texto #ventas"}"#.to_string())
                    }
                }),
        );

        let result = studio(backend).generate_marketing_packs("Gimnasio").await.unwrap();
        assert_eq!(result.succeeded(), 4);
        assert_eq!(result.summary(), "4 de 5 variantes generadas");
    }

    #[tokio::test]
    async fn test_script_variants_follow_angles() {
        let backend = Arc::new(MockBackend::new().with_text(|_| Ok(SCRIPT_JSON.to_string())));
        let request = GenerationRequest::new("Curso", "Todos", vec!["Valor".into()], Tone::Aggressive);

        let result = studio(backend.clone())
            .generate_script_variants(&request, Variant::script_angles())
            .await
            .unwrap();

        assert_eq!(result.succeeded(), 3);
        let prompts = backend.recorded_prompts();
        assert!(prompts.iter().any(|p| p.contains("escasez")));
        assert!(prompts.iter().any(|p| p.contains("reciprocidad")));
    }

    #[tokio::test]
    async fn test_sanitizer_runs_once_before_fan_out() {
        let backend = Arc::new(
            MockBackend::new()
                .with_text(|_| Ok(r#"{"corrected": "Agencia inmobiliaria"}"#.to_string()))
                .with_image(|_| Ok(png())),
        );
        let studio = studio(backend.clone())
            .with_sanitizer(InputSanitizer::new(backend.clone(), "lite"));

        let result = studio.generate_image_variants("ajencia inmobiliaria").await.unwrap();

        assert_eq!(result.succeeded(), 5);
        assert_eq!(backend.structured_calls.load(Ordering::SeqCst), 1);
        assert!(
            backend
                .recorded_prompts()
                .iter()
                .filter(|p| p.starts_with("Imagen publicitaria"))
                .all(|p| p.contains("Agencia inmobiliaria"))
        );
    }

    #[tokio::test]
    async fn test_objection_response() {
        let backend = Arc::new(MockBackend::new().with_text(|_| {
            Ok(r#"{"rebuttal": "Entiendo, comparemos el costo de no actuar.", "psychology": "Aversión a la pérdida", "closingTip": "Ofrece un plan de pagos"}"#.to_string())
        }));

        let response = studio(backend.clone())
            .handle_objection(&ObjectionRequest::new("Está muy caro", None))
            .await
            .unwrap();

        assert_eq!(response.psychology, "Aversión a la pérdida");
        assert!(backend.recorded_prompts()[0].contains("Producto General"));
    }

    #[tokio::test]
    async fn test_video_script() {
        let backend = Arc::new(MockBackend::new().with_text(|_| {
            Ok(r#"{"hook": "¿Te duele la espalda?", "scenes": [{"visual": "Oficina", "audio": "Voz en off", "duration": "0:00 - 0:05"}], "cta": "Compra ahora"}"#.to_string())
        }));

        let script = studio(backend)
            .generate_video_script(&VideoScriptRequest::new("Silla ergonómica", None))
            .await
            .unwrap();

        assert_eq!(script.scenes.len(), 1);
    }

    #[tokio::test]
    async fn test_marketing_video_polls_then_downloads() {
        let backend = Arc::new(MockBackend::new().with_video_polls(vec![
            Ok(VideoOperation::pending("models/mock/operations/1")),
            Ok(VideoOperation::finished(
                "models/mock/operations/1",
                "https://example.com/video.mp4",
            )),
        ]));

        let asset = studio(backend.clone())
            .generate_marketing_video(&VideoRequest::new("App de finanzas", "720p", "16:9"))
            .await
            .unwrap();

        assert_eq!(asset.kind, MediaKind::Video);
        assert_eq!(asset.media.data, b"https://example.com/video.mp4".to_vec());
        assert_eq!(backend.poll_calls.load(Ordering::SeqCst), 2);
        assert_eq!(backend.download_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_studio_stops_immediately() {
        let backend = Arc::new(MockBackend::new().with_text(|_| Ok(SCRIPT_JSON.to_string())));
        let studio = studio(backend.clone());
        studio.cancel_token().cancel();

        let request = GenerationRequest::new("Curso", "Todos", vec![], Tone::Professional);
        let err = studio.generate_sales_script(&request).await.unwrap_err();

        assert!(matches!(err, CopyError::Cancelled));
        assert_eq!(backend.structured_calls.load(Ordering::SeqCst), 0);
    }

    struct RecordingSelector {
        opened: Mutex<u32>,
    }

    #[async_trait]
    impl KeySelector for RecordingSelector {
        async fn has_selected_key(&self) -> bool {
            true
        }

        async fn open_select_key(&self) -> Result<()> {
            *self.opened.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_permission_error_opens_key_selection() {
        let backend = Arc::new(MockBackend::new().with_text(|_| {
            Err(ServiceError::from_signals(Some(403), Some("PERMISSION_DENIED".into()), "billing").into())
        }));
        let selector = Arc::new(RecordingSelector {
            opened: Mutex::new(0),
        });
        let studio = MarketingStudio::new(backend.clone(), selector.clone())
            .with_sanitizer(InputSanitizer::new(backend.clone(), "lite").with_enabled(false));

        let err = studio
            .handle_objection(&ObjectionRequest::new("No tengo tiempo", None))
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::PermissionDenied);
        assert_eq!(backend.structured_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*selector.opened.lock().unwrap(), 1);
    }
}
