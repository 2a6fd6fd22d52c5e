//! `WorkQueue`: the bounded FIFO between producers and the writer.
//!
//! The queue outlives writer generations: each generation receives a clone
//! of the receiving end, so items left behind by a retired writer are picked
//! up by its successor. It is the only state shared between producer threads
//! and the writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use sift_core::errors::StorageError;
use sift_core::types::node::ResourceNode;

pub struct WorkQueue {
    tx: Sender<ResourceNode>,
    rx: Mutex<Option<Receiver<ResourceNode>>>,
    enqueue_timeout: Option<Duration>,
    closed: AtomicBool,
}

impl WorkQueue {
    pub fn new(capacity: usize, enqueue_timeout: Option<Duration>) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            enqueue_timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Append a node, blocking while the queue is full.
    ///
    /// Fails with `QueueClosed` once the store has shut down, or with
    /// `EnqueueTimedOut` when an enqueue timeout is configured and expires.
    /// The node is dropped in both cases; the caller decides whether to
    /// retry or abort.
    pub fn enqueue(&self, node: ResourceNode) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(self.closed_error(node.id));
        }

        match self.enqueue_timeout {
            None => self.tx.send(node).map_err(|e| self.closed_error(e.0.id)),
            Some(timeout) => self.tx.send_timeout(node, timeout).map_err(|e| match e {
                SendTimeoutError::Timeout(node) => {
                    tracing::warn!(
                        node_id = ?node.id,
                        timeout_ms = timeout.as_millis() as u64,
                        "Work queue full; enqueue timed out, node not saved"
                    );
                    StorageError::EnqueueTimedOut {
                        timeout_ms: timeout.as_millis() as u64,
                    }
                }
                SendTimeoutError::Disconnected(node) => self.closed_error(node.id),
            }),
        }
    }

    /// A receiving end for a new writer generation.
    pub fn subscribe(&self) -> Result<Receiver<ResourceNode>, StorageError> {
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .cloned()
            .ok_or(StorageError::QueueClosed)
    }

    /// Refuse new items. Producers blocked on a full queue are released with
    /// `QueueClosed` once the last writer generation drops its receiver.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Fixed at construction.
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }

    fn closed_error(&self, node_id: Option<i64>) -> StorageError {
        tracing::warn!(node_id = ?node_id, "Work queue closed; node not saved");
        StorageError::QueueClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let queue = WorkQueue::new(4, None);
        let rx = queue.subscribe().unwrap();
        for id in 1..=3 {
            queue.enqueue(ResourceNode { id: Some(id), ..Default::default() }).unwrap();
        }
        let ids: Vec<_> = rx.try_iter().map(|n| n.id.unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn full_queue_times_out() {
        let queue = WorkQueue::new(1, Some(Duration::from_millis(10)));
        let _rx = queue.subscribe().unwrap();
        queue.enqueue(ResourceNode::default()).unwrap();
        let err = queue.enqueue(ResourceNode::default()).unwrap_err();
        assert!(matches!(err, StorageError::EnqueueTimedOut { timeout_ms: 10 }));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn closed_queue_rejects_items() {
        let queue = WorkQueue::new(2, None);
        queue.close();
        assert!(matches!(
            queue.enqueue(ResourceNode::default()),
            Err(StorageError::QueueClosed)
        ));
        assert!(matches!(queue.subscribe(), Err(StorageError::QueueClosed)));
    }

    #[test]
    fn blocked_producer_released_on_close() {
        let queue = std::sync::Arc::new(WorkQueue::new(1, None));
        let rx = queue.subscribe().unwrap();
        queue.enqueue(ResourceNode::default()).unwrap();

        let producer = {
            let queue = std::sync::Arc::clone(&queue);
            std::thread::spawn(move || queue.enqueue(ResourceNode::default()))
        };
        std::thread::sleep(Duration::from_millis(20));
        queue.close();
        drop(rx);

        assert!(matches!(producer.join().unwrap(), Err(StorageError::QueueClosed)));
    }
}
