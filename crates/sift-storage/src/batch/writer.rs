//! Dedicated writer thread, one per generation.
//!
//! The writer owns its connection and statement cache outright. It stages
//! queued nodes and commits them in one transaction every `batch_size`
//! items. On `Stop` or `Drain` it flushes the partial batch, closes its
//! statements and connection, and returns its stats through the join handle.
//!
//! Each staged item runs in its own SAVEPOINT. A failing item is rolled back
//! alone, logged, counted, and reported on the failure channel; the rest of
//! the batch commits. Failed items are not retried.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use rusqlite::{params, Connection};
use sift_core::errors::StorageError;
use sift_core::SiftErrorCode;
use sift_core::traits::storage::{WriteFailure, WriteStats};
use sift_core::types::node::ResourceNode;

use super::commands::{Applied, StagedWrite, WriterSignal};
use super::statements::{
    identification_insert_sql, StatementCache, INSERT_NODE_SQL, UPDATE_NODE_STATUS_SQL,
};

/// Lifecycle of a writer generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Running,
    Draining,
    Closed,
}

impl WriterState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Draining => 1,
            Self::Closed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::Closed,
        }
    }
}

/// Shared, read-only view of a generation's state.
#[derive(Debug, Clone)]
pub(crate) struct WriterStateHandle(Arc<AtomicU8>);

impl WriterStateHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(WriterState::Running.as_u8())))
    }

    pub(crate) fn get(&self) -> WriterState {
        WriterState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WriterState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

/// Per-generation writer settings.
#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    pub batch_size: usize,
    pub statement_cache_capacity: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            statement_cache_capacity: 32,
        }
    }
}

/// Handle to one writer generation.
pub struct BatchWriter {
    signals: Sender<WriterSignal>,
    handle: Option<JoinHandle<Result<WriteStats, StorageError>>>,
    state: WriterStateHandle,
    generation: u64,
}

impl BatchWriter {
    /// Prepare the generation's statements on `conn`, then move both to a new
    /// writer thread consuming `queue`.
    ///
    /// Preparation happens on the calling thread, so a broken connection or
    /// schema is reported here rather than lost inside the worker.
    pub fn spawn(
        conn: Connection,
        queue: Receiver<ResourceNode>,
        options: WriterOptions,
        failures: Sender<WriteFailure>,
        generation: u64,
    ) -> Result<Self, StorageError> {
        let statements =
            StatementCache::open(conn, options.statement_cache_capacity, generation)?;
        let (signal_tx, signal_rx) = bounded(1);
        let state = WriterStateHandle::new();

        let staging = Staging {
            statements,
            staged: Vec::with_capacity(options.batch_size),
            batch_size: options.batch_size.max(1),
            stats: WriteStats::default(),
            failures,
            generation,
        };
        let thread_state = state.clone();
        let handle = thread::Builder::new()
            .name(format!("sift-batch-writer-{generation}"))
            .spawn(move || writer_loop(staging, queue, signal_rx, thread_state))
            .map_err(|e| StorageError::WriterUnavailable {
                message: format!("failed to spawn batch writer thread: {e}"),
            })?;

        tracing::debug!(generation, batch_size = options.batch_size, "Batch writer started");
        Ok(Self {
            signals: signal_tx,
            handle: Some(handle),
            state,
            generation,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> WriterState {
        self.state.get()
    }

    /// Flush the partial batch, close, and wait for the thread.
    /// Items still in the queue stay there.
    pub fn stop(self) -> Result<WriteStats, StorageError> {
        self.finish(WriterSignal::Stop)
    }

    /// Stage everything still queued, flush, close, and wait for the thread.
    pub fn drain(self) -> Result<WriteStats, StorageError> {
        self.finish(WriterSignal::Drain)
    }

    fn finish(mut self, signal: WriterSignal) -> Result<WriteStats, StorageError> {
        // A full signal slot means a stop is already pending.
        let _ = self.signals.try_send(signal);
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| StorageError::WriterUnavailable {
                message: format!("batch writer thread {} panicked", self.generation),
            })?,
            None => Ok(WriteStats::default()),
        }
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        // Dropped without stop/drain: the thread flushes what it staged and
        // exits, leaving queued items for the next generation. Unjoined.
        let _ = self.signals.try_send(WriterSignal::Stop);
    }
}

fn writer_loop(
    mut staging: Staging,
    queue: Receiver<ResourceNode>,
    signals: Receiver<WriterSignal>,
    state: WriterStateHandle,
) -> Result<WriteStats, StorageError> {
    loop {
        select! {
            recv(signals) -> signal => {
                state.set(WriterState::Draining);
                if let Ok(WriterSignal::Drain) = signal {
                    for node in queue.try_iter() {
                        staging.accept(node);
                    }
                }
                break;
            }
            recv(queue) -> node => match node {
                Ok(node) => staging.accept(node),
                Err(_) => {
                    state.set(WriterState::Draining);
                    break;
                }
            },
        }
    }

    staging.flush();
    let generation = staging.generation;
    let Staging {
        statements, stats, ..
    } = staging;
    let closed = statements.close();
    state.set(WriterState::Closed);

    match closed {
        Ok(()) => {
            tracing::debug!(
                generation,
                nodes = stats.nodes_inserted,
                updates = stats.status_updates,
                failed = stats.failed,
                flushes = stats.flushes,
                "Batch writer closed"
            );
            Ok(stats)
        }
        Err(e) => {
            tracing::error!(generation, error = %e, "Batch writer failed to release its connection");
            Err(e)
        }
    }
}

/// Mutable state of a running generation.
struct Staging {
    statements: StatementCache,
    staged: Vec<StagedWrite>,
    batch_size: usize,
    stats: WriteStats,
    failures: Sender<WriteFailure>,
    generation: u64,
}

impl Staging {
    fn accept(&mut self, node: ResourceNode) {
        match stage(node) {
            Ok(write) => {
                self.staged.push(write);
                if self.staged.len() >= self.batch_size {
                    self.flush();
                }
            }
            Err((node_id, reason)) => {
                tracing::error!(generation = self.generation, node_id = ?node_id, %reason, "Rejected write");
                self.report(node_id, reason);
            }
        }
    }

    /// Execute and commit everything staged.
    fn flush(&mut self) {
        if self.staged.is_empty() {
            return;
        }
        let batch = std::mem::replace(&mut self.staged, Vec::with_capacity(self.batch_size));
        let generation = self.generation;

        match execute_batch(self.statements.connection_mut(), &batch, epoch_millis()) {
            Ok(outcome) => {
                self.stats.flushes += 1;
                self.stats.largest_batch = self.stats.largest_batch.max(batch.len());
                self.stats.nodes_inserted += outcome.nodes_inserted;
                self.stats.identification_rows += outcome.identification_rows;
                self.stats.status_updates += outcome.status_updates;
                for (node_id, reason) in outcome.failures {
                    tracing::error!(generation, node_id = ?node_id, %reason, "Write rolled back");
                    self.report(node_id, reason);
                }
                tracing::trace!(generation, items = batch.len(), "Committed batch");
            }
            Err(e) => {
                tracing::error!(
                    generation,
                    items = batch.len(),
                    code = e.error_code(),
                    error = %e,
                    "Batch commit failed; staged writes lost"
                );
                for write in &batch {
                    self.report(write.node_id(), format!("batch commit failed: {e}"));
                }
            }
        }
    }

    fn report(&mut self, node_id: Option<i64>, reason: String) {
        self.stats.failed += 1;
        let _ = self.failures.try_send(WriteFailure {
            node_id,
            generation: self.generation,
            reason,
        });
    }
}

fn stage(node: ResourceNode) -> Result<StagedWrite, (Option<i64>, String)> {
    if node.status_update {
        let Some(node_id) = node.id else {
            return Err((
                None,
                format!(
                    "node flagged for status update has no id (parent id {:?})",
                    node.parent_id
                ),
            ));
        };
        let Some(status) = node.metadata.status else {
            return Err((
                Some(node_id),
                "node flagged for status update has no status".to_string(),
            ));
        };
        return Ok(StagedWrite::UpdateStatus { node_id, status });
    }

    if node.id.is_none() || node.prefix.is_none() {
        return Err((
            node.id,
            format!("node {} was enqueued without an assigned identity", node.uri),
        ));
    }
    Ok(StagedWrite::Insert(node))
}

#[derive(Debug, Default)]
struct BatchOutcome {
    nodes_inserted: usize,
    identification_rows: usize,
    status_updates: usize,
    failures: Vec<(Option<i64>, String)>,
}

fn execute_batch(
    conn: &mut Connection,
    batch: &[StagedWrite],
    finished_at: i64,
) -> Result<BatchOutcome, StorageError> {
    let mut tx = conn.transaction().map_err(|e| StorageError::SqliteError {
        message: format!("begin transaction: {e}"),
    })?;

    let mut outcome = BatchOutcome::default();
    for write in batch {
        let sp = tx.savepoint().map_err(|e| StorageError::SqliteError {
            message: format!("savepoint: {e}"),
        })?;
        match apply(&sp, write, finished_at) {
            Ok(applied) => {
                sp.commit().map_err(|e| StorageError::SqliteError {
                    message: format!("release savepoint: {e}"),
                })?;
                match applied {
                    Applied::Inserted {
                        identification_rows,
                    } => {
                        outcome.nodes_inserted += 1;
                        outcome.identification_rows += identification_rows;
                    }
                    Applied::StatusUpdated => outcome.status_updates += 1,
                }
            }
            // Dropping the savepoint rolls this item back.
            Err(e) => outcome.failures.push((write.node_id(), e.to_string())),
        }
    }

    tx.commit().map_err(|e| StorageError::SqliteError {
        message: format!("commit: {e}"),
    })?;
    Ok(outcome)
}

fn apply(conn: &Connection, write: &StagedWrite, finished_at: i64) -> Result<Applied, StorageError> {
    match write {
        StagedWrite::Insert(node) => {
            insert_node(conn, node, finished_at)?;
            let identification_rows = insert_identifications(conn, node)?;
            Ok(Applied::Inserted {
                identification_rows,
            })
        }
        StagedWrite::UpdateStatus { node_id, status } => {
            let changed = conn
                .prepare_cached(UPDATE_NODE_STATUS_SQL)
                .map_err(|e| StorageError::SqliteError { message: e.to_string() })?
                .execute(params![status.ordinal(), node_id])
                .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
            if changed == 0 {
                return Err(StorageError::NodeNotFound { node_id: *node_id });
            }
            Ok(Applied::StatusUpdated)
        }
    }
}

fn insert_node(conn: &Connection, node: &ResourceNode, finished_at: i64) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(INSERT_NODE_SQL)
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    let meta = &node.metadata;
    stmt.execute(params![
        node.id,
        node.parent_id,
        node.prefix,
        node.prefix_plus_one,
        meta.name,
        node.uri,
        meta.size,
        meta.extension,
        meta.last_modified,
        meta.hash,
        meta.status.map(|s| s.ordinal()),
        meta.resource_type.map(|t| t.ordinal()),
        meta.identification_method.map(|m| m.ordinal()),
        node.identification_count() as i64,
        node.extension_mismatch,
        finished_at,
    ])
    .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(())
}

/// Write the node's identification rows with the statement shaped for its
/// arity. Returns the number of rows written, including a placeholder.
fn insert_identifications(conn: &Connection, node: &ResourceNode) -> Result<usize, StorageError> {
    let arity = node.identification_count();
    let sql = identification_insert_sql(arity);
    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;

    stmt.raw_bind_parameter(1, node.id)
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    for (i, format) in node.identifications.iter().enumerate() {
        stmt.raw_bind_parameter(i + 2, format.code.as_str())
            .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    }
    let rows = stmt
        .raw_execute()
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(rows)
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::types::node::NodeMetadata;
    use sift_core::types::status::NodeStatus;

    #[test]
    fn status_update_without_id_rejected_at_staging() {
        let mut node = ResourceNode::status_update(1, NodeStatus::Done);
        node.id = None;
        assert!(matches!(stage(node), Err((None, _))));
    }

    #[test]
    fn status_update_without_status_rejected_at_staging() {
        let mut node = ResourceNode::status_update(4, NodeStatus::Done);
        node.metadata.status = None;
        assert!(matches!(stage(node), Err((Some(4), _))));
    }

    #[test]
    fn insert_without_identity_rejected_at_staging() {
        let node = ResourceNode::new("file:///a", NodeMetadata::default());
        assert!(stage(node).is_err());
    }

    #[test]
    fn failing_item_rolls_back_alone() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&conn).unwrap();

        let mut first = ResourceNode::new("file:///a", NodeMetadata::default());
        first.assign_identity(1, None).unwrap();
        let duplicate = first.clone();
        let mut second = ResourceNode::new("file:///b", NodeMetadata::default());
        second.assign_identity(2, None).unwrap();

        let batch = vec![
            StagedWrite::Insert(first),
            StagedWrite::Insert(duplicate),
            StagedWrite::Insert(second),
        ];
        let outcome = execute_batch(&mut conn, &batch, 0).unwrap();
        assert_eq!(outcome.nodes_inserted, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, Some(1));

        // The duplicate's identification placeholder was rolled back too.
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM identification WHERE node_id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn zero_row_status_update_is_a_failure() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&conn).unwrap();
        let batch = vec![StagedWrite::UpdateStatus {
            node_id: 99,
            status: NodeStatus::Error,
        }];
        let outcome = execute_batch(&mut conn, &batch, 0).unwrap();
        assert_eq!(outcome.status_updates, 0);
        assert_eq!(outcome.failures.len(), 1);
    }
}
