//! Pull/push sync engine
//!
//! Moves the question collection between the remote store and the local
//! cache. Each run is a single unit triggered by the caller:
//!
//! - pull: fetch everything, validate each record, replace the cache
//! - push: read the cache, build one batch, commit it atomically
//!
//! Only one run per direction may be in flight; a second one fails fast
//! with [`SyncError::AlreadyRunning`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::status::{
    Direction, Phase, PullReport, PushReport, RunOutcome, RunStatus, SyncEvent,
    ValidationDiagnostic,
};
use crate::document::{DocumentConverter, RemoteDocument};
use crate::models::{CachedQuestion, Question};
use crate::remote::{RemoteStore, WriteBatch};
use crate::schema::{self, contracts, SchemaContract};
use crate::storage::LocalCache;

/// Per-direction run state
struct RunSlot {
    running: AtomicBool,
    status: watch::Sender<RunStatus>,
    status_rx: watch::Receiver<RunStatus>,
}

impl RunSlot {
    fn new() -> Self {
        let (status, status_rx) = watch::channel(RunStatus::default());
        Self {
            running: AtomicBool::new(false),
            status,
            status_rx,
        }
    }

    fn acquire(&self, direction: Direction) -> Result<RunGuard<'_>, SyncError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::AlreadyRunning(direction))?;
        Ok(RunGuard {
            running: &self.running,
        })
    }
}

/// Releases the run slot when dropped, including on early return
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Sync engine for one remote collection
pub struct SyncEngine<R> {
    cache: Arc<LocalCache>,
    remote: R,
    collection: String,
    contract: SchemaContract,
    converter: DocumentConverter,
    pull_slot: RunSlot,
    push_slot: RunSlot,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<SyncEvent>>>,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(cache: Arc<LocalCache>, remote: R, collection: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            cache,
            remote,
            collection: collection.into(),
            contract: contracts::question(),
            converter: DocumentConverter::new(),
            pull_slot: RunSlot::new(),
            push_slot: RunSlot::new(),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Current status of one direction
    pub fn status(&self, direction: Direction) -> RunStatus {
        self.slot(direction).status_rx.borrow().clone()
    }

    /// Subscribe to status changes of one direction
    pub fn subscribe(&self, direction: Direction) -> watch::Receiver<RunStatus> {
        self.slot(direction).status_rx.clone()
    }

    /// Take the event receiver (can only be called once)
    ///
    /// Until the receiver is taken or discarded, events queue up inside the
    /// engine. Callers that don't want them should call
    /// [`discard_events`](Self::discard_events).
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        self.event_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    /// Drop the event receiver; later events are not kept
    pub fn discard_events(&self) {
        drop(self.take_events());
    }

    // ==================== Pull ====================

    /// Replace the cache with the remote collection
    ///
    /// Returns the number of records cached. Records that fail validation
    /// are still cached, flagged unvalidated.
    pub async fn pull_questions(&self) -> Result<usize, SyncError> {
        self.pull().await.map(|report| report.cached)
    }

    /// Like [`pull_questions`](Self::pull_questions), with the unvalidated count
    pub async fn pull(&self) -> Result<PullReport, SyncError> {
        let _guard = self.pull_slot.acquire(Direction::Pull)?;
        info!(
            "Pulling '{}' from {}",
            self.collection,
            self.remote.describe()
        );

        let result = self.run_pull().await;
        match &result {
            Ok(report) => {
                info!(
                    "Pull complete: {} cached, {} unvalidated, {} skipped",
                    report.cached, report.unvalidated, report.skipped
                );
                self.finish(Direction::Pull, RunOutcome::Pulled(*report));
                self.emit(SyncEvent::PullCompleted(*report));
            }
            Err(e) => self.fail(Direction::Pull, e),
        }
        result
    }

    async fn run_pull(&self) -> Result<PullReport, SyncError> {
        self.set_phase(Direction::Pull, Phase::Fetching);
        let documents = self
            .remote
            .fetch_all(&self.collection)
            .await
            .map_err(SyncError::Network)?;
        debug!("Fetched {} document(s)", documents.len());

        self.set_phase(Direction::Pull, Phase::Validating);
        let mut admitted = Vec::with_capacity(documents.len());
        let mut skipped = 0;
        for document in documents {
            if document.id.is_empty() {
                skipped += 1;
                self.skip("document has an empty key");
                continue;
            }
            admitted.push(self.admit(document));
        }
        let unvalidated = admitted.iter().filter(|q| !q.validated).count();

        self.set_phase(Direction::Pull, Phase::Replacing);
        let cached = self.cache.replace_questions(&admitted)?;

        Ok(PullReport {
            cached,
            unvalidated,
            skipped,
        })
    }

    /// Convert and validate one remote document (warn-and-admit)
    fn admit(&self, document: RemoteDocument) -> CachedQuestion {
        let record_id = document.id.clone();
        let record = self.converter.from_remote(document);

        match schema::check_as::<Question>(&Value::Object(record.clone()), &self.contract) {
            Ok(coerced) => CachedQuestion {
                record: coerced,
                validated: true,
            },
            Err(err) => {
                let diagnostic = ValidationDiagnostic {
                    collection: self.collection.clone(),
                    record_id,
                    errors: err.errors,
                };
                warn!("Admitting unvalidated record {}", diagnostic);
                self.emit(SyncEvent::ValidationWarning(diagnostic));
                CachedQuestion::unvalidated(record)
            }
        }
    }

    // ==================== Push ====================

    /// Write every cached question to the remote in one atomic batch
    pub async fn push_questions(&self) -> Result<PushReport, SyncError> {
        let _guard = self.push_slot.acquire(Direction::Push)?;
        info!(
            "Pushing '{}' to {}",
            self.collection,
            self.remote.describe()
        );

        let result = self.run_push().await;
        match &result {
            Ok(report) => {
                info!(
                    "Push complete: {} written, {} skipped",
                    report.written, report.skipped
                );
                self.finish(Direction::Push, RunOutcome::Pushed(*report));
                self.emit(SyncEvent::PushCompleted(*report));
            }
            Err(e) => self.fail(Direction::Push, e),
        }
        result
    }

    async fn run_push(&self) -> Result<PushReport, SyncError> {
        self.set_phase(Direction::Push, Phase::Reading);
        let questions = self.cache.questions()?;

        self.set_phase(Direction::Push, Phase::Batching);
        let (batch, skipped) = self.build_batch(&questions);
        let attempted = batch.len();

        if batch.is_empty() {
            debug!("Nothing to push");
            return Ok(PushReport {
                written: 0,
                skipped,
            });
        }

        self.set_phase(Direction::Push, Phase::Committing);
        self.remote
            .commit(batch)
            .await
            .map_err(|source| SyncError::Commit { attempted, source })?;

        Ok(PushReport {
            written: attempted,
            skipped,
        })
    }

    /// One set-operation per record; records without identity are skipped
    fn build_batch(&self, questions: &[CachedQuestion]) -> (WriteBatch, usize) {
        let mut batch = WriteBatch::new(self.collection.clone());
        let mut skipped = 0;

        for question in questions {
            match question.id() {
                Some(id) => batch.set(id, self.converter.to_remote(&question.record)),
                None => {
                    skipped += 1;
                    self.skip("record has no identity");
                }
            }
        }

        (batch, skipped)
    }

    fn skip(&self, reason: &str) {
        warn!("Skipping {} record: {}", self.collection, reason);
        self.emit(SyncEvent::RecordSkipped {
            collection: self.collection.clone(),
            reason: reason.to_string(),
        });
    }

    // ==================== Status ====================

    fn slot(&self, direction: Direction) -> &RunSlot {
        match direction {
            Direction::Pull => &self.pull_slot,
            Direction::Push => &self.push_slot,
        }
    }

    fn set_phase(&self, direction: Direction, phase: Phase) {
        debug!("{} phase: {}", direction, phase);
        self.slot(direction)
            .status
            .send_modify(|status| status.phase = phase);
        self.emit(SyncEvent::PhaseChanged { direction, phase });
    }

    fn finish(&self, direction: Direction, outcome: RunOutcome) {
        self.slot(direction).status.send_replace(RunStatus {
            phase: Phase::Idle,
            last_outcome: Some(outcome),
        });
        self.emit(SyncEvent::PhaseChanged {
            direction,
            phase: Phase::Idle,
        });
    }

    fn fail(&self, direction: Direction, error: &SyncError) {
        warn!("{} failed: {}", direction, error);
        let message = error.to_string();
        self.finish(
            direction,
            RunOutcome::Failed {
                message: message.clone(),
            },
        );
        self.emit(SyncEvent::RunFailed { direction, message });
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.event_tx.send(event);
    }
}
