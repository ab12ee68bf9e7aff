//! Scripted backend for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::GenerativeBackend;
use crate::ai::schema::ResponseSchema;
use crate::ai::video::VideoOperation;
use crate::types::{
    CopyError, ErrorCategory, ImageRequest, InlineMedia, Result, ServiceError, VideoRequest,
};

type TextResponder = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;
type ImageResponder = Box<dyn Fn(&str) -> Result<Option<InlineMedia>> + Send + Sync>;

pub(crate) struct MockBackend {
    text: TextResponder,
    image: ImageResponder,
    video_polls: Mutex<VecDeque<Result<VideoOperation>>>,
    delay: Duration,
    pub structured_calls: AtomicU32,
    pub image_calls: AtomicU32,
    pub poll_calls: AtomicU32,
    pub download_calls: AtomicU32,
    pub prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            text: Box::new(|_| {
                Err(ServiceError::new(ErrorCategory::Unknown, "no text scripted").into())
            }),
            image: Box::new(|_| Ok(None)),
            video_polls: Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            structured_calls: AtomicU32::new(0),
            image_calls: AtomicU32::new(0),
            poll_calls: AtomicU32::new(0),
            download_calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer structured calls with `f(prompt)`
    pub fn with_text(mut self, f: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        self.text = Box::new(f);
        self
    }

    /// Answer image calls with `f(prompt)`
    pub fn with_image(
        mut self,
        f: impl Fn(&str) -> Result<Option<InlineMedia>> + Send + Sync + 'static,
    ) -> Self {
        self.image = Box::new(f);
        self
    }

    /// Hold every structured call for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Successive poll results
    pub fn with_video_polls(self, polls: Vec<Result<VideoOperation>>) -> Self {
        *self.video_polls.lock().unwrap() = polls.into();
        self
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn record(&self, prompt: &str) {
        self.prompts.lock().unwrap().push(prompt.to_string());
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_structured(
        &self,
        _model: &str,
        prompt: &str,
        _schema: &ResponseSchema,
    ) -> Result<String> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.text)(prompt)
    }

    async fn generate_image(
        &self,
        _model: &str,
        prompt: &str,
        _request: &ImageRequest,
    ) -> Result<Option<InlineMedia>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        (self.image)(prompt)
    }

    async fn start_video(
        &self,
        _model: &str,
        prompt: &str,
        _request: &VideoRequest,
    ) -> Result<VideoOperation> {
        self.record(prompt);
        Ok(VideoOperation::pending("models/mock/operations/1"))
    }

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.video_polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(operation.clone()))
    }

    async fn download_video(&self, uri: &str) -> Result<InlineMedia> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if uri.is_empty() {
            return Err(CopyError::NoMedia("empty uri".into()));
        }
        Ok(InlineMedia::new("video/mp4", uri.as_bytes().to_vec()))
    }
}
