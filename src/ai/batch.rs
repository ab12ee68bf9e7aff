//! Batch Orchestrator
//!
//! Fans one base request out into N variant requests, each run through the
//! retry controller, and collects the partial successes.
//!
//! ## Features
//!
//! - **Dispatch Modes**: concurrent with a bounded in-flight count
//!   (`buffer_unordered`), or sequential with a fixed pause between requests
//! - **Partial Success**: a failed variant is logged and dropped; only an
//!   all-failed batch is an error
//! - **Progress**: a callback fires after every completion in both modes
//! - **Stable Order**: successes are returned in variant order regardless of
//!   completion order
//! - **Credential Halt**: once a variant's key is rejected no further
//!   variants are dispatched; the retry controller prompts for a key once

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::ai::retry::RetryController;
use crate::constants::batch as batch_constants;
use crate::types::{CopyError, Result};

// =============================================================================
// Variants
// =============================================================================

/// One style/angle used to diversify a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Short label for logs and progress
    pub label: String,
    /// Instruction appended to the base prompt
    pub angle: String,
}

impl Variant {
    pub fn new(label: impl Into<String>, angle: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            angle: angle.into(),
        }
    }

    /// Base prompt text with this variant's angle
    pub fn apply(&self, base: &str) -> String {
        format!("{} - {}", base.trim(), self.angle)
    }

    /// The five ad image styles
    pub fn image_styles() -> Vec<Variant> {
        vec![
            Variant::new("corporate", "Enfoque corporativo y serio"),
            Variant::new("dynamic", "Enfoque dinámico y creativo"),
            Variant::new("minimalist", "Enfoque minimalista y limpio"),
            Variant::new("futuristic", "Enfoque tecnológico y futurista"),
            Variant::new("human", "Enfoque humano y emocional"),
        ]
    }

    /// Persuasion angles for sales script batches
    pub fn script_angles() -> Vec<Variant> {
        vec![
            Variant::new("scarcity", "Enfatiza la escasez y la urgencia de la oferta"),
            Variant::new("authority", "Apóyate en la autoridad y la prueba social"),
            Variant::new("reciprocity", "Aplica la reciprocidad entregando valor antes de pedir"),
        ]
    }
}

// =============================================================================
// Dispatch and Progress
// =============================================================================

/// How variant requests are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Up to `max_in_flight` requests at once; completion order unspecified
    Concurrent { max_in_flight: usize },
    /// One at a time with `pause` between requests; completes in order
    Sequential { pause: Duration },
}

impl Default for DispatchMode {
    fn default() -> Self {
        Self::Sequential {
            pause: Duration::from_millis(batch_constants::SEQUENTIAL_PAUSE_MS),
        }
    }
}

/// Snapshot reported after each variant completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    /// Label of the variant that just completed
    pub label: String,
}

pub type ProgressCallback = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

// =============================================================================
// Batch Result
// =============================================================================

/// Ordered successes of a batch with at least one success
#[derive(Debug, Clone)]
pub struct BatchResult<T> {
    successes: Vec<(Variant, T)>,
    attempted: usize,
}

impl<T> BatchResult<T> {
    pub fn successes(&self) -> &[(Variant, T)] {
        &self.successes
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.successes.iter().map(|(_, item)| item)
    }

    pub fn into_items(self) -> Vec<T> {
        self.successes.into_iter().map(|(_, item)| item).collect()
    }

    pub fn succeeded(&self) -> usize {
        self.successes.len()
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.successes.len()
    }

    /// "k de N variantes generadas"
    pub fn summary(&self) -> String {
        format!("{} de {} variantes generadas", self.succeeded(), self.attempted)
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Issues variant requests against the retry-wrapped primitive
#[derive(Clone)]
pub struct BatchOrchestrator {
    retry: RetryController,
    mode: DispatchMode,
    progress: Option<ProgressCallback>,
}

impl BatchOrchestrator {
    pub fn new(retry: RetryController, mode: DispatchMode) -> Self {
        Self {
            retry,
            mode,
            progress: None,
        }
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Run `task` once per variant (with retry) and collect the successes
    ///
    /// Returns `BatchFailed` when no variant succeeded and `Cancelled` when the
    /// token cut the batch short. A token fired after the last variant
    /// completed does not discard the results.
    #[instrument(skip_all, fields(operation = %operation, variants = variants.len(), mode = ?self.mode))]
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        variants: Vec<Variant>,
        cancel: &CancellationToken,
        task: F,
    ) -> Result<BatchResult<T>>
    where
        F: Fn(&Variant) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total = variants.len();
        let mut tally = Tally::new(total, self.progress.clone());

        match self.mode {
            DispatchMode::Concurrent { max_in_flight } => {
                let task = &task;
                let retry = &self.retry;
                let halted = &AtomicBool::new(false);
                let mut stream = futures::stream::iter(variants.into_iter().enumerate())
                    .map(|(idx, variant)| async move {
                        if halted.load(Ordering::SeqCst) {
                            return (idx, variant, None);
                        }
                        let outcome = retry.execute(&variant.label, cancel, || task(&variant)).await;
                        if rejects_key(&outcome) {
                            halted.store(true, Ordering::SeqCst);
                        }
                        (idx, variant, Some(outcome))
                    })
                    .buffer_unordered(max_in_flight.max(1));

                while let Some((idx, variant, outcome)) = stream.next().await {
                    match outcome {
                        Some(outcome) => tally.record(idx, variant, outcome),
                        None => debug!(variant = %variant.label, "Skipped after key rejection"),
                    }
                }
            }
            DispatchMode::Sequential { pause } => {
                for (idx, variant) in variants.into_iter().enumerate() {
                    if idx > 0 && !pause.is_zero() {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => {
                                tally.cancelled = true;
                                break;
                            }
                            _ = tokio::time::sleep(pause) => {}
                        }
                    }
                    if cancel.is_cancelled() {
                        tally.cancelled = true;
                        break;
                    }

                    let outcome = self
                        .retry
                        .execute(&variant.label, cancel, || task(&variant))
                        .await;
                    let halt = rejects_key(&outcome);
                    tally.record(idx, variant, outcome);
                    if halt {
                        info!("Key rejected, stopping dispatch");
                        break;
                    }
                }
            }
        }

        if tally.cancelled {
            info!(completed = tally.completed, total, "Batch cancelled");
            return Err(CopyError::Cancelled);
        }

        tally.finish(operation)
    }
}

/// Whether a variant failed because the active key was rejected
fn rejects_key<T>(outcome: &Result<T>) -> bool {
    outcome
        .as_ref()
        .is_err_and(|e| e.category().requires_reselection())
}

/// Running counts for one batch
struct Tally<T> {
    total: usize,
    completed: usize,
    cancelled: bool,
    successes: Vec<(usize, Variant, T)>,
    last_error: Option<CopyError>,
    progress: Option<ProgressCallback>,
}

impl<T> Tally<T> {
    fn new(total: usize, progress: Option<ProgressCallback>) -> Self {
        Self {
            total,
            completed: 0,
            cancelled: false,
            successes: Vec::with_capacity(total),
            last_error: None,
            progress,
        }
    }

    fn record(&mut self, idx: usize, variant: Variant, outcome: Result<T>) {
        if matches!(outcome, Err(CopyError::Cancelled)) {
            self.cancelled = true;
            return;
        }
        self.completed += 1;
        let label = variant.label.clone();

        match outcome {
            Ok(item) => {
                debug!(variant = %label, "Variant succeeded");
                self.successes.push((idx, variant, item));
            }
            Err(e) => {
                warn!(variant = %label, error = %e, "Variant failed");
                self.last_error = Some(e);
            }
        }

        if let Some(callback) = &self.progress {
            callback(&BatchProgress {
                completed: self.completed,
                total: self.total,
                succeeded: self.successes.len(),
                label,
            });
        }
    }

    fn finish(mut self, operation: &str) -> Result<BatchResult<T>> {
        if self.successes.is_empty() {
            let last_error = self
                .last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no variants requested".to_string());
            return Err(CopyError::BatchFailed {
                attempted: self.total,
                last_error,
            });
        }

        self.successes.sort_by_key(|(idx, _, _)| *idx);
        let result = BatchResult {
            successes: self
                .successes
                .into_iter()
                .map(|(_, variant, item)| (variant, item))
                .collect(),
            attempted: self.total,
        };

        info!(
            operation,
            succeeded = result.succeeded(),
            attempted = result.attempted(),
            "Batch complete"
        );
        Ok(result)
    }
}
