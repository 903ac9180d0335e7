//! Upload lifecycle: validation, transfer, progress and the terminal outcome.
//!
//! State machine:
//!
//! ```text
//! Idle --submit--> Validating --ok--> Uploading(p) --2xx+urls--> Succeeded
//!                      |                   |
//!                      +--invalid--> Idle  +--error/timeout/cancel--> Failed
//!
//! Failed --submit--> Validating      Succeeded --reset--> Idle
//! ```
//!
//! Every submission gets a generation number. Resubmitting, cancelling or
//! resetting bumps the generation and aborts the running transfer task, so a
//! late completion or progress callback from an older transfer is dropped
//! instead of overwriting the current state.
//!
//! State is published through a `tokio::sync::watch` channel: observers always
//! see the latest value and intermediate progress ticks may coalesce.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::Url;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use super::response::parse_artifacts;
use super::transport::{HttpTransport, Transport, TransportResponse, UploadPayload};
use crate::config::ClientConfig;
use crate::error::{SubmitError, TransferError, TransferResult};
use crate::models::{GeneratedArtifact, SubmissionMode, UploadProgress, UploadRequest};
use crate::validation::{check_request, FilePolicy};

// =============================================================================
// State
// =============================================================================

/// Where the current submission stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadState {
    #[default]
    Idle,
    Validating,
    Uploading(UploadProgress),
    Succeeded(Vec<GeneratedArtifact>),
    Failed(TransferError),
}

impl UploadState {
    /// Validation or transfer is running.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadState::Validating | UploadState::Uploading(_))
    }

    pub fn is_settled(&self) -> bool {
        !self.is_in_flight()
    }

    pub fn progress(&self) -> Option<UploadProgress> {
        match self {
            UploadState::Uploading(progress) => Some(*progress),
            UploadState::Succeeded(_) => Some(UploadProgress::COMPLETE),
            _ => None,
        }
    }

    pub fn artifacts(&self) -> &[GeneratedArtifact] {
        match self {
            UploadState::Succeeded(artifacts) => artifacts,
            _ => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::Validating => "validating",
            UploadState::Uploading(_) => "uploading",
            UploadState::Succeeded(_) => "succeeded",
            UploadState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Uploading(progress) => write!(f, "uploading ({})", progress),
            UploadState::Succeeded(artifacts) => write!(f, "succeeded ({} artifact(s))", artifacts.len()),
            UploadState::Failed(err) => write!(f, "failed: {}", err),
            other => f.write_str(other.label()),
        }
    }
}

// =============================================================================
// Shared state
// =============================================================================

struct Control {
    generation: u64,
    in_flight: Option<AbortHandle>,
}

impl Control {
    /// Abort the running transfer, if any, and start a new generation.
    fn supersede(&mut self) -> u64 {
        if let Some(handle) = self.in_flight.take() {
            log::info!("⚠️  Abandoning upload #{}", self.generation);
            handle.abort();
        }
        self.generation += 1;
        self.generation
    }
}

struct Shared {
    state: watch::Sender<UploadState>,
    control: Mutex<Control>,
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a terminal state, unless `generation` has been superseded.
    fn commit(&self, generation: u64, next: UploadState) -> bool {
        let mut control = self.control();
        if control.generation != generation {
            log::debug!("Dropping result of superseded upload #{}", generation);
            return false;
        }
        control.in_flight = None;
        self.state.send_replace(next);
        true
    }

    /// Raise the published progress. Never lowers it.
    fn publish_progress(&self, generation: u64, progress: UploadProgress) -> bool {
        let control = self.control();
        if control.generation != generation {
            return false;
        }
        self.state.send_if_modified(|state| match state {
            UploadState::Uploading(current) if progress > *current => {
                *current = progress;
                true
            }
            _ => false,
        })
    }
}

// =============================================================================
// Progress reporting
// =============================================================================

/// Counts bytes handed to the transport and publishes rising percentages.
///
/// Cheap to clone; every clone feeds the same counter. A reporter belonging to
/// a superseded submission keeps counting but publishes nothing.
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<ReporterInner>,
}

struct ReporterInner {
    total: u64,
    sent: AtomicU64,
    last: AtomicU8,
    sink: Option<(Arc<Shared>, u64)>,
}

impl ProgressReporter {
    /// A reporter not attached to any orchestrator.
    pub fn detached(total: u64) -> Self {
        Self::build(total, None)
    }

    fn attached(shared: Arc<Shared>, generation: u64, total: u64) -> Self {
        Self::build(total, Some((shared, generation)))
    }

    fn build(total: u64, sink: Option<(Arc<Shared>, u64)>) -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                total,
                sent: AtomicU64::new(0),
                last: AtomicU8::new(0),
                sink,
            }),
        }
    }

    pub fn total(&self) -> u64 {
        self.inner.total
    }

    pub fn sent(&self) -> u64 {
        self.inner.sent.load(Ordering::SeqCst)
    }

    /// Record `bytes` more handed over.
    ///
    /// Returns the new percentage when it rose and was published.
    pub fn advance(&self, bytes: u64) -> Option<UploadProgress> {
        let sent = self
            .inner
            .sent
            .fetch_add(bytes, Ordering::SeqCst)
            .saturating_add(bytes);
        let progress = UploadProgress::from_bytes(sent, self.inner.total);

        let previous = self.inner.last.fetch_max(progress.percent(), Ordering::SeqCst);
        if progress.percent() <= previous {
            return None;
        }

        match &self.inner.sink {
            Some((shared, generation)) => shared.publish_progress(*generation, progress).then_some(progress),
            None => Some(progress),
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("total", &self.inner.total)
            .field("sent", &self.sent())
            .field("attached", &self.inner.sink.is_some())
            .finish()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Owns the upload state machine for one form.
///
/// Must be used from within a tokio runtime: [`UploadOrchestrator::submit`]
/// spawns the transfer as a task.
pub struct UploadOrchestrator {
    config: ClientConfig,
    policy: FilePolicy,
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
}

impl UploadOrchestrator {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(UploadState::Idle);
        Self {
            config,
            policy: FilePolicy::default(),
            transport,
            shared: Arc::new(Shared {
                state,
                control: Mutex::new(Control {
                    generation: 0,
                    in_flight: None,
                }),
            }),
        }
    }

    /// Orchestrator posting to the configured backend over HTTP.
    pub fn http(config: ClientConfig) -> Self {
        let transport = HttpTransport::new(config.upload_url());
        Self::new(config, Arc::new(transport))
    }

    pub fn with_policy(mut self, policy: FilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn mode(&self) -> SubmissionMode {
        self.config.mode
    }

    /// Current state snapshot.
    pub fn state(&self) -> UploadState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that sees every state change (progress may coalesce).
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.shared.state.subscribe()
    }

    /// Generation of the most recent submission.
    pub fn generation(&self) -> u64 {
        self.shared.control().generation
    }

    /// Validate and, if everything passes, start transferring `request`.
    ///
    /// Any transfer already running is abandoned first. Returns the new
    /// submission's generation. Validation failures leave the state at
    /// `Idle` and nothing is sent.
    pub fn submit(&self, request: UploadRequest) -> Result<u64, SubmitError> {
        let mut control = self.shared.control();

        let already_succeeded = matches!(*self.shared.state.borrow(), UploadState::Succeeded(_));
        if already_succeeded {
            return Err(SubmitError::NotReset);
        }

        let generation = control.supersede();
        self.shared.state.send_replace(UploadState::Validating);

        if let Err(errors) = check_request(&request, self.config.mode, &self.policy) {
            log::warn!("❌ Upload #{} rejected: {} problem(s)", generation, errors.len());
            for error in &errors {
                log::warn!("   {}", error);
            }
            self.shared.state.send_replace(UploadState::Idle);
            return Err(SubmitError::Invalid(errors));
        }

        let payload = UploadPayload::from_request(&request);
        let total = payload.total_bytes();
        let reporter = ProgressReporter::attached(Arc::clone(&self.shared), generation, total);

        log::info!("🚀 Upload #{} started ({} bytes, {:?} mode)", generation, total, self.config.mode);
        self.shared.state.send_replace(UploadState::Uploading(UploadProgress::ZERO));

        let transfer = self.transport.send(payload, reporter);
        let shared = Arc::clone(&self.shared);
        let limit = self.config.upload_timeout;
        let base = self.config.backend_url.clone();
        let mode = self.config.mode;

        let task = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(limit, transfer).await {
                Ok(result) => result.and_then(|response| interpret(response, &base, mode)),
                Err(_) => Err(TransferError::Timeout),
            };

            let next = match outcome {
                Ok(artifacts) => {
                    shared.publish_progress(generation, UploadProgress::COMPLETE);
                    log::info!("✅ Upload #{} finished: {} artifact(s)", generation, artifacts.len());
                    UploadState::Succeeded(artifacts)
                }
                Err(err) => {
                    log::error!("❌ Upload #{} failed: {}", generation, err);
                    UploadState::Failed(err)
                }
            };
            shared.commit(generation, next);
        });

        control.in_flight = Some(task.abort_handle());
        Ok(generation)
    }

    /// Abandon the running submission, settling at `Failed(Cancelled)`.
    ///
    /// Returns `false` when nothing was in flight.
    pub fn cancel(&self) -> bool {
        let mut control = self.shared.control();
        let in_flight = self.shared.state.borrow().is_in_flight();
        if !in_flight {
            return false;
        }
        control.supersede();
        self.shared.state.send_replace(UploadState::Failed(TransferError::Cancelled));
        true
    }

    /// Return to `Idle` from any state, abandoning a running transfer.
    pub fn reset(&self) {
        let mut control = self.shared.control();
        control.supersede();
        self.shared.state.send_replace(UploadState::Idle);
    }

    /// Wait until nothing is in flight and return that state.
    pub async fn settled(&self) -> UploadState {
        let mut receiver = self.shared.state.subscribe();
        let settled = receiver
            .wait_for(UploadState::is_settled)
            .await
            .map(|state| UploadState::clone(&state));
        settled.unwrap_or_else(|_| self.state())
    }
}

impl Drop for UploadOrchestrator {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.control().in_flight.take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for UploadOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("config", &self.config)
            .field("state", &*self.shared.state.borrow())
            .finish_non_exhaustive()
    }
}

fn interpret(response: TransportResponse, base: &Url, mode: SubmissionMode) -> TransferResult<Vec<GeneratedArtifact>> {
    if !response.is_success() {
        return Err(TransferError::ServerError(response.status));
    }
    parse_artifacts(&response.body, response.content_type.as_deref(), base, mode)
}
