//! Retry Controller
//!
//! Bounded exponential-backoff retry around a single backend call.
//!
//! ## Features
//!
//! - **Category Routing**: quota and transient faults retry, malformed replies
//!   retry once, credential faults invoke key reselection and fail
//! - **Exponential Backoff**: `min(base * 2^attempt, max)` plus random jitter
//!   using the `rand` crate
//! - **Retry Hints**: a provider-supplied delay raises the wait to at least the hint
//! - **Cancellation**: in-flight attempts and backoff waits abort on the token
//! - **Per-Attempt Timeout**: an expired attempt counts as a transient fault
//!
//! ## State Machine
//!
//! `Attempting -> Success | Retrying -> Attempting | Failed`. Attempts are
//! strictly sequential; the attempt index starts at 0.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::ai::credentials::{KeySelector, SharedKeySelector};
use crate::ai::timeout::with_timeout;
use crate::constants::retry as retry_constants;
use crate::types::{CopyError, ErrorCategory, Result};

// =============================================================================
// Policy
// =============================================================================

/// Retry limits and backoff shape
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed, first try included
    pub max_attempts: u32,
    /// Backoff delay for attempt 0
    pub base_delay: Duration,
    /// Cap applied to the exponential term (jitter is added after the cap)
    pub max_delay: Duration,
    /// Jitter is drawn from `[0, max_jitter)`
    pub max_jitter: Duration,
    /// Extra attempts granted to malformed responses
    pub malformed_retries: u32,
    /// Client-side bound per attempt (zero disables)
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry_constants::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry_constants::MAX_DELAY_SECS),
            max_jitter: Duration::from_millis(retry_constants::MAX_JITTER_MS),
            malformed_retries: retry_constants::MALFORMED_RETRIES,
            attempt_timeout: Duration::from_secs(retry_constants::ATTEMPT_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Backoff after failed attempt `attempt`: `min(base * 2^attempt, max) + jitter`
    pub fn backoff_delay(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let exponential = self.base_delay.saturating_mul(factor);
        std::cmp::min(exponential, self.max_delay) + jitter
    }

    /// Wait before the next attempt, honoring a provider hint
    pub fn next_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.backoff_delay(attempt, random_jitter(self.max_jitter));
        match retry_after {
            Some(hint) => {
                let hint = hint.min(Duration::from_secs(retry_constants::MAX_RETRY_HINT_SECS));
                backoff.max(hint)
            }
            None => backoff,
        }
    }
}

/// Random jitter in `[0, max)` using the thread-local RNG
fn random_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_ms))
}

// =============================================================================
// Retry State
// =============================================================================

/// Progress of one retry-wrapped call
#[derive(Debug, Default)]
pub struct RetryState {
    /// Index of the current attempt (0-based)
    pub attempt: u32,
    /// Most recent failure
    pub last_error: Option<CopyError>,
    /// Delay scheduled before the next attempt
    pub next_delay: Option<Duration>,
    malformed_retries_used: u32,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Retry,
    Reselect,
    Exhausted,
    Fail,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    fn judge(&mut self, category: ErrorCategory, policy: &RetryPolicy) -> Verdict {
        if category.requires_reselection() {
            return Verdict::Reselect;
        }
        if !category.is_retryable() {
            return Verdict::Fail;
        }

        let malformed = category == ErrorCategory::MalformedResponse;
        let budget_left = !malformed || self.malformed_retries_used < policy.malformed_retries;
        if self.attempt + 1 < policy.max_attempts && budget_left {
            if malformed {
                self.malformed_retries_used += 1;
            }
            Verdict::Retry
        } else {
            Verdict::Exhausted
        }
    }
}

// =============================================================================
// Reselection Gate
// =============================================================================

/// Collapses concurrent credential failures into one key selection
///
/// Each attempt records the generation it started under. A failure from an
/// older generation means another caller already reselected, so the hook
/// is skipped.
#[derive(Debug, Default)]
struct ReselectGate {
    generation: AtomicU64,
    lock: Mutex<()>,
}

impl ReselectGate {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    async fn reselect(&self, observed: u64, selector: &dyn KeySelector) {
        let _guard = self.lock.lock().await;
        if self.generation() != observed {
            debug!("Key already reselected by a concurrent call");
            return;
        }

        if let Err(hook_err) = selector.open_select_key().await {
            warn!(error = %hook_err, "Key selection failed");
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Executes operations with category-aware retry
///
/// Clones share one reselection gate, so a batch fanned out from one
/// controller prompts for a key at most once per rejected key.
#[derive(Clone)]
pub struct RetryController {
    policy: RetryPolicy,
    selector: SharedKeySelector,
    gate: Arc<ReselectGate>,
}

impl RetryController {
    pub fn new(policy: RetryPolicy, selector: SharedKeySelector) -> Self {
        Self {
            policy,
            selector,
            gate: Arc::new(ReselectGate::default()),
        }
    }

    /// Same key selector, different policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out
    ///
    /// `op` is invoked once per attempt and must build a fresh future each time.
    #[instrument(skip(self, cancel, op), fields(max_attempts = self.policy.max_attempts))]
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = RetryState::new();

        loop {
            if cancel.is_cancelled() {
                return Err(CopyError::Cancelled);
            }

            debug!(attempt = state.attempt, "Attempting");
            let generation = self.gate.generation();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CopyError::Cancelled),
                outcome = with_timeout(self.policy.attempt_timeout, op(), operation) => outcome,
            };

            let err = match outcome {
                Ok(value) => {
                    if state.attempt > 0 {
                        info!(attempts = state.attempt + 1, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let category = err.category();
            warn!(
                attempt = state.attempt,
                category = %category,
                error = %err,
                "Attempt failed"
            );

            match state.judge(category, &self.policy) {
                Verdict::Retry => {
                    let delay = self.policy.next_delay(state.attempt, err.retry_after());
                    debug!(delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                    state.next_delay = Some(delay);
                    state.last_error = Some(err);

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(CopyError::Cancelled),
                        _ = sleep(delay) => {}
                    }
                    state.attempt += 1;
                }
                Verdict::Reselect => {
                    info!(category = %category, "Credential rejected, opening key selection");
                    self.gate.reselect(generation, self.selector.as_ref()).await;
                    return Err(err);
                }
                Verdict::Exhausted => {
                    return Err(CopyError::RetriesExhausted {
                        category,
                        attempts: state.attempt + 1,
                        message: err.to_string(),
                    });
                }
                Verdict::Fail => return Err(err),
            }
        }
    }
}
