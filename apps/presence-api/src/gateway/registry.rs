//! Registry of open WebSocket connections eligible for broadcast.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// A serialized envelope shared by every connection it is queued on.
pub type Outbound = Arc<str>;

/// Smallest queue that can hold the bootstrap plus one pending broadcast.
const MIN_QUEUE_CAPACITY: usize = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("connection is closed")]
pub struct ConnectionClosed;

/// How an envelope landed on a connection's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Appended,
    /// The queue was full and the newest pending envelope was replaced.
    Superseded,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Outbound>,
    closed: bool,
}

#[derive(Debug)]
struct Queue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
}

impl Queue {
    fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
    }
}

/// Receiving half of a connection's outbound queue, drained by its writer task.
///
/// Dropping the receiver closes the queue.
#[derive(Debug)]
pub struct OutboundReceiver {
    queue: Arc<Queue>,
}

impl OutboundReceiver {
    /// Wait for the next envelope. Returns `None` once the queue is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<Outbound> {
        loop {
            {
                let mut state = self.queue.state.lock();
                if let Some(payload) = state.items.pop_front() {
                    return Some(payload);
                }
                if state.closed {
                    return None;
                }
            }
            self.queue.notify.notified().await;
        }
    }

    pub fn try_recv(&mut self) -> Option<Outbound> {
        self.queue.state.lock().items.pop_front()
    }
}

impl Drop for OutboundReceiver {
    fn drop(&mut self) {
        self.queue.close();
    }
}

/// Handle to one open connection. Carries no user identity.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: String,
    queue: Arc<Queue>,
    open: AtomicBool,
}

impl ConnectionHandle {
    /// Create a handle with a bounded outbound queue of `capacity` envelopes
    /// (at least two).
    pub fn new(id: String, capacity: usize) -> (Arc<Self>, OutboundReceiver) {
        let queue = Arc::new(Queue {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            capacity: capacity.max(MIN_QUEUE_CAPACITY),
        });
        let handle = Arc::new(Self {
            id,
            queue: queue.clone(),
            open: AtomicBool::new(true),
        });
        (handle, OutboundReceiver { queue })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.queue.state.lock().closed
    }

    /// Mark the connection closed. Envelopes already queued are still
    /// delivered, then the receiver sees the end of the queue.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.queue.close();
    }

    /// Queue an envelope without waiting.
    ///
    /// Every envelope is a full snapshot, so when the queue is full the newest
    /// pending one is replaced rather than the new one discarded. The head of
    /// the queue is never replaced, which keeps an unsent bootstrap first.
    pub fn send(&self, payload: Outbound) -> Result<Enqueued, ConnectionClosed> {
        if !self.open.load(Ordering::Acquire) {
            return Err(ConnectionClosed);
        }
        let mut state = self.queue.state.lock();
        if state.closed {
            return Err(ConnectionClosed);
        }
        let outcome = if state.items.len() >= self.queue.capacity {
            if let Some(tail) = state.items.back_mut() {
                *tail = payload;
            }
            Enqueued::Superseded
        } else {
            state.items.push_back(payload);
            Enqueued::Appended
        };
        drop(state);
        self.queue.notify.notify_one();
        Ok(outcome)
    }
}

/// Shared set of open connections.
///
/// Uses `DashMap` for shard-level concurrency between connection lifecycle
/// events and the broadcast path.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: Arc<ConnectionHandle>) {
        self.connections.insert(handle.id.clone(), handle);
    }

    /// Remove a connection and mark it closed. Returns the removed handle.
    pub fn unregister(&self, connection_id: &str) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.connections.remove(connection_id)?;
        handle.close();
        Some(handle)
    }

    /// Connections currently registered and still open.
    pub fn open_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections
            .iter()
            .filter(|entry| entry.value().is_open())
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close and remove every connection. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let before = self.connections.len();
        self.connections.retain(|_, handle| {
            handle.close();
            false
        });
        before
    }
}
