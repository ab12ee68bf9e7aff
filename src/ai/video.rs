//! Long-Running Video Generation
//!
//! Video generation returns an operation handle that must be polled until the
//! service marks it done. The poller is an explicit state machine
//! (`Pending(poll n) -> Done(uri) | Failed(error)`) with a fixed interval, a
//! maximum poll count and a cancellation check at every wait.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::ai::provider::GenerativeBackend;
use crate::ai::retry::RetryController;
use crate::constants::video as video_constants;
use crate::types::{CopyError, Result, ServiceError};

/// Handle to a video generation in progress
#[derive(Debug, Clone)]
pub struct VideoOperation {
    /// Service-side operation name (e.g. `models/veo/operations/abc`)
    pub name: String,
    pub done: bool,
    /// Download URI of the first generated sample, once done
    pub uri: Option<String>,
    /// Failure reported inside the finished operation
    pub error: Option<ServiceError>,
}

impl VideoOperation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            uri: None,
            error: None,
        }
    }

    pub fn finished(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            uri: Some(uri.into()),
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: ServiceError) -> Self {
        Self {
            name: name.into(),
            done: true,
            uri: None,
            error: Some(error),
        }
    }
}

/// Poller state after observing an operation
#[derive(Debug)]
pub enum PollState {
    /// Not finished after `n` polls
    Pending(u32),
    Done(String),
    Failed(CopyError),
}

/// Bounded, cancellable poller
#[derive(Debug, Clone)]
pub struct VideoPoller {
    interval: Duration,
    max_polls: u32,
}

impl Default for VideoPoller {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(video_constants::POLL_INTERVAL_SECS),
            max_polls: video_constants::MAX_POLLS,
        }
    }
}

impl VideoPoller {
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval,
            max_polls,
        }
    }

    /// Upper bound on time spent waiting
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_polls)
    }

    /// Transition after `polls` polls have returned `operation`
    pub fn observe(&self, polls: u32, operation: &VideoOperation) -> PollState {
        if let Some(err) = &operation.error {
            return PollState::Failed(CopyError::Service(err.clone()));
        }

        if operation.done {
            return match &operation.uri {
                Some(uri) => PollState::Done(uri.clone()),
                None => PollState::Failed(CopyError::NoMedia(format!(
                    "operation {} finished without a video",
                    operation.name
                ))),
            };
        }

        if polls >= self.max_polls {
            return PollState::Failed(CopyError::timeout(
                format!("video operation {}", operation.name),
                self.budget(),
            ));
        }

        PollState::Pending(polls)
    }

    /// Poll until done and return the download URI
    ///
    /// Each poll is a retry-wrapped call, so a transient poll failure does not
    /// abandon the operation.
    #[instrument(skip_all, fields(operation = %operation.name))]
    pub async fn wait(
        &self,
        backend: &dyn GenerativeBackend,
        retry: &RetryController,
        mut operation: VideoOperation,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut polls = 0u32;

        loop {
            match self.observe(polls, &operation) {
                PollState::Done(uri) => {
                    info!(polls, "Video ready");
                    return Ok(uri);
                }
                PollState::Failed(err) => return Err(err),
                PollState::Pending(n) => {
                    debug!(poll = n, interval_ms = self.interval.as_millis() as u64, "Video pending");

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(CopyError::Cancelled),
                        _ = tokio::time::sleep(self.interval) => {}
                    }

                    let current = &operation;
                    operation = retry
                        .execute("video_poll", cancel, || backend.poll_video(current))
                        .await?;
                    polls += 1;
                }
            }
        }
    }
}
