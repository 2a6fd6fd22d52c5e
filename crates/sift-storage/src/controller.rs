//! `CommitController`: owns the work queue and the writer generations.
//!
//! Producers call [`CommitController::save`], which assigns identity and
//! enqueues without touching the store. [`CommitController::commit`] waits
//! (bounded) for the queue to drain, retires the current writer, which
//! flushes its partial batch and closes its statements and connection, and
//! only then starts the next generation with a fresh statement cache.
//!
//! The drain wait is latency-first: if the queue does not empty within the
//! configured timeout the swap happens anyway. Items still queued are not
//! lost; they belong to the next generation and commit with a later batch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use sift_core::config::StorageConfig;
use sift_core::errors::StorageError;
use sift_core::SiftErrorCode;
use sift_core::traits::storage::{CommitReport, WriteFailure, WriteStats};
use sift_core::types::node::{ResourceId, ResourceNode};
use sift_core::types::status::NodeStatus;

use crate::batch::commands::WriterSignal;
use crate::batch::queue::WorkQueue;
use crate::batch::writer::{BatchWriter, WriterOptions, WriterState};
use crate::connection::DatabaseManager;
use crate::ids::NodeIdAllocator;

/// Failure reports kept for callers that have not read them yet.
const FAILURE_CHANNEL_BOUND: usize = 1024;

pub struct CommitController {
    db: DatabaseManager,
    queue: WorkQueue,
    ids: NodeIdAllocator,
    options: WriterOptions,
    drain_timeout: Duration,
    poll_interval: Duration,
    current: Mutex<Option<BatchWriter>>,
    generations: AtomicU64,
    /// A writer generation is installed and consuming the queue.
    live: AtomicBool,
    totals: Mutex<WriteStats>,
    failures_tx: Sender<WriteFailure>,
    failures_rx: Receiver<WriteFailure>,
}

impl CommitController {
    /// Create the queue and start the first writer generation.
    pub fn start(
        db: DatabaseManager,
        ids: NodeIdAllocator,
        config: &StorageConfig,
    ) -> Result<Self, StorageError> {
        let (failures_tx, failures_rx) = bounded(FAILURE_CHANNEL_BOUND);
        let controller = Self {
            db,
            queue: WorkQueue::new(
                config.effective_queue_capacity(),
                config.effective_enqueue_timeout(),
            ),
            ids,
            options: WriterOptions {
                batch_size: config.effective_batch_size(),
                statement_cache_capacity: config.effective_statement_cache_capacity(),
            },
            drain_timeout: config.effective_commit_drain_timeout(),
            poll_interval: config.effective_commit_poll_interval(),
            current: Mutex::new(None),
            generations: AtomicU64::new(0),
            live: AtomicBool::new(false),
            totals: Mutex::new(WriteStats::default()),
            failures_tx,
            failures_rx,
        };

        let first = controller.spawn_generation()?;
        *controller.lock_current() = Some(first);
        controller.live.store(true, Ordering::Release);
        Ok(controller)
    }

    /// Assign identifier, parent and prefixes to `node`, then enqueue it.
    ///
    /// Nodes flagged as status updates keep their existing identifier and
    /// are enqueued unchanged.
    pub fn save(
        &self,
        mut node: ResourceNode,
        parent: Option<&ResourceId>,
    ) -> Result<ResourceId, StorageError> {
        self.ensure_live()?;
        if node.status_update {
            return self.enqueue_status_update(node);
        }
        let resource_id = node.assign_identity(self.ids.next(), parent)?;
        self.queue.enqueue(node)?;
        Ok(resource_id)
    }

    /// Enqueue a status-only update for a persisted node.
    pub fn update_status(&self, node_id: i64, status: NodeStatus) -> Result<(), StorageError> {
        self.ensure_live()?;
        self.queue.enqueue(ResourceNode::status_update(node_id, status))
    }

    fn enqueue_status_update(&self, node: ResourceNode) -> Result<ResourceId, StorageError> {
        let id = node.id.ok_or_else(|| StorageError::InvalidNode {
            reason: "status update without an identifier".to_string(),
        })?;
        let path = node.prefix.clone().unwrap_or_default();
        self.queue.enqueue(node)?;
        Ok(ResourceId { id, path })
    }

    /// Drain (bounded), retire the current writer, start a new generation.
    pub fn commit(&self) -> Result<CommitReport, StorageError> {
        let mut current = self.lock_current();
        if self.queue.is_closed() {
            return Err(StorageError::QueueClosed);
        }

        let drained = self.wait_for_drain();
        let left_in_queue = self.queue.len();
        if !drained {
            tracing::warn!(
                left_in_queue,
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "Work queue did not drain before commit; remaining items move to the next writer"
            );
        }

        let retired = match current.take() {
            Some(writer) => self.retire(writer, WriterSignal::Stop),
            None => Ok(WriteStats::default()),
        };

        let next = match self.spawn_generation() {
            Ok(next) => next,
            Err(e) => {
                self.live.store(false, Ordering::Release);
                tracing::error!(
                    code = e.error_code(),
                    error = %e,
                    pending = self.queue.len(),
                    "Failed to start writer generation; saves are refused until a commit succeeds"
                );
                return Err(e);
            }
        };
        let generation = next.generation();
        *current = Some(next);
        self.live.store(true, Ordering::Release);

        let retired = retired?;
        tracing::debug!(generation, drained, written = retired.written(), "Committed writer generation");
        Ok(CommitReport {
            drained,
            left_in_queue,
            generation,
            retired,
        })
    }

    /// Close the queue, let the last writer stage whatever is still queued,
    /// flush, and stop. Returns cumulative stats. Idempotent.
    pub fn shutdown(&self) -> Result<WriteStats, StorageError> {
        let mut current = self.lock_current();
        let already_closed = self.queue.is_closed();
        self.queue.close();
        self.live.store(false, Ordering::Release);
        if let Some(writer) = current.take() {
            self.retire(writer, WriterSignal::Drain)?;
        } else if already_closed {
            return Ok(self.stats());
        }

        let abandoned = self.queue.len();
        if abandoned > 0 {
            tracing::warn!(abandoned, "Queued items were not written before shutdown");
        }
        let totals = self.stats();
        tracing::info!(
            nodes = totals.nodes_inserted,
            updates = totals.status_updates,
            failed = totals.failed,
            "Profile writer shut down"
        );
        Ok(totals)
    }

    /// Cumulative stats of retired generations.
    pub fn stats(&self) -> WriteStats {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receiver of dropped-write reports from every generation.
    pub fn failures(&self) -> Receiver<WriteFailure> {
        self.failures_rx.clone()
    }

    /// Generation number of the running writer, if any.
    pub fn generation(&self) -> Option<u64> {
        self.lock_current().as_ref().map(BatchWriter::generation)
    }

    pub fn writer_state(&self) -> Option<WriterState> {
        self.lock_current().as_ref().map(BatchWriter::state)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Refuse new work while no generation is consuming the queue. A closed
    /// queue reports `QueueClosed` from the enqueue itself.
    fn ensure_live(&self) -> Result<(), StorageError> {
        if self.live.load(Ordering::Acquire) || self.queue.is_closed() {
            return Ok(());
        }
        Err(StorageError::WriterUnavailable {
            message: "no writer generation is running; retry commit()".to_string(),
        })
    }

    fn spawn_generation(&self) -> Result<BatchWriter, StorageError> {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let conn = self.db.connect()?;
        let queue = self.queue.subscribe()?;
        BatchWriter::spawn(
            conn,
            queue,
            self.options,
            self.failures_tx.clone(),
            generation,
        )
    }

    fn retire(&self, writer: BatchWriter, signal: WriterSignal) -> Result<WriteStats, StorageError> {
        let generation = writer.generation();
        let result = match signal {
            WriterSignal::Stop => writer.stop(),
            WriterSignal::Drain => writer.drain(),
        };
        match result {
            Ok(stats) => {
                self.totals
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .merge(&stats);
                Ok(stats)
            }
            Err(e) => {
                tracing::error!(
                    generation,
                    code = e.error_code(),
                    error = %e,
                    "Writer generation ended with an error"
                );
                Err(e)
            }
        }
    }

    fn wait_for_drain(&self) -> bool {
        let deadline = Instant::now() + self.drain_timeout;
        loop {
            if self.queue.is_empty() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<BatchWriter>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CommitController {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!(error = %e, "Profile writer shutdown failed during drop");
        }
    }
}
