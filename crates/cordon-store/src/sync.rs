//! Change-queue sync module
//!
//! Optional extra that records entity changes for an external
//! replicator. Queued changes are drained by the replicator at its own
//! pace; in realtime mode each change is also forwarded eagerly through
//! a fire-and-forget outbox. Bounded like every other shared resource:
//! overflow drops the oldest queued change and counts it.

use crate::events::Outbox;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// What happened to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Row written (created or overwritten)
    Saved,
    /// Row removed
    Deleted,
}

/// One queued change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncChange {
    /// Store name
    pub store: String,
    /// Physical key affected
    pub key: String,
    /// Change kind
    pub kind: ChangeKind,
    /// Unix timestamp of the change
    pub at: u64,
}

/// Bounded change queue with optional realtime forwarding
#[derive(Debug)]
pub struct SyncModule {
    queue: Mutex<VecDeque<SyncChange>>,
    capacity: usize,
    dropped: AtomicU64,
    realtime: Option<Outbox<SyncChange>>,
}

impl SyncModule {
    /// Create a queue-only sync module
    pub fn new(capacity: usize) -> Self {
        SyncModule {
            queue: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
            realtime: None,
        }
    }

    /// Create a sync module that also forwards each change eagerly
    pub fn realtime(capacity: usize, outbox: Outbox<SyncChange>) -> Self {
        SyncModule {
            realtime: Some(outbox),
            ..Self::new(capacity)
        }
    }

    /// Record a change; oldest queued change is dropped (and counted) on
    /// overflow
    pub fn record_change(&self, change: SyncChange) {
        if let Some(outbox) = &self.realtime {
            outbox.emit(change.clone());
        }
        if let Ok(mut queue) = self.queue.lock() {
            if queue.len() == self.capacity {
                queue.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(change);
        }
    }

    /// Take every queued change, oldest first
    pub fn drain(&self) -> Vec<SyncChange> {
        self.queue
            .lock()
            .map(|mut queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Changes lost to queue overflow
    pub fn dropped_changes(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of changes waiting to be drained
    pub fn pending(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }
}
