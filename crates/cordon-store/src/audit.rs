//! Audit trail
//!
//! Security-relevant occurrences append to a bounded in-memory ring and
//! forward to an external forensic sink through a fire-and-forget
//! outbox. The ring is append-only from the storage instance that owns
//! it; no external mutation path exists.

use crate::events::Outbox;
use cordon_core::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Kinds of security-relevant occurrences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// A security context was established
    ContextSet,
    /// The security context was cleared
    ContextCleared,
    /// An access decision allowed an operation
    AccessGranted,
    /// An access decision denied an operation
    AccessDenied,
    /// A payload was sealed
    EncryptAttempt,
    /// A payload open was attempted
    DecryptAttempt,
    /// An entity was persisted
    EntitySaved,
    /// Physical instances were removed
    EntityDeleted,
}

/// One audit record
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Unix timestamp of the occurrence
    pub at: u64,
    /// Occurrence kind
    pub kind: AuditKind,
    /// Structured detail for the forensic sink
    pub payload: Value,
}

/// Bounded append-only audit ring with sink forwarding.
///
/// The ring keeps the most recent `capacity` events for in-process
/// inspection; every event is also offered to the sink outbox, which
/// never blocks and counts what it cannot deliver.
#[derive(Debug)]
pub struct AuditLog {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
    sink: Outbox<AuditEvent>,
}

impl AuditLog {
    /// Create a ring of the given capacity forwarding to `sink`
    pub fn new(capacity: usize, sink: Outbox<AuditEvent>) -> Self {
        AuditLog {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            sink,
        }
    }

    /// Append an event, evicting the oldest on overflow
    pub fn record(&self, at: u64, kind: AuditKind, payload: Value) {
        let event = AuditEvent { at, kind, payload };
        self.sink.emit(event.clone());
        if let Ok(mut events) = self.events.lock() {
            if events.len() == self.capacity {
                events.pop_front();
            }
            events.push_back(event);
        }
    }

    /// The most recent events, oldest first
    pub fn recent(&self, count: usize) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| {
                let skip = events.len().saturating_sub(count);
                events.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Number of events currently retained
    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    /// True when nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events the sink outbox could not deliver
    pub fn undelivered(&self) -> Result<u64> {
        Ok(self.sink.dropped_events())
    }
}
