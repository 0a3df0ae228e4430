//! Outbound notifications
//!
//! The store emits named notifications for an external event engine and
//! forwards audit events to an external forensic sink. Both are
//! fire-and-forget: a bounded channel that never blocks a storage
//! operation, with a counter of dropped events instead of silent loss.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Named notifications emitted by the composed storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// An entity was persisted
    EntitySaved {
        /// Store name
        store: String,
        /// Physical key written
        key: String,
        /// Classification level of the saved record
        level: String,
    },
    /// One or more physical instances were removed
    EntityDeleted {
        /// Store name
        store: String,
        /// Physical keys removed
        keys: Vec<String>,
    },
    /// An access decision allowed the operation
    AccessGranted {
        /// Subject label display form
        subject: String,
        /// Object label display form
        object: String,
    },
    /// An access decision denied the operation
    AccessDenied {
        /// Subject label display form
        subject: String,
        /// Object label display form
        object: String,
        /// Which layer denied: `mac` or `rbac`
        layer: String,
    },
    /// A security context was established
    SecurityContextSet {
        /// Authenticated user
        user_id: String,
        /// Granted label display form
        label: String,
    },
    /// The security context was cleared
    SecurityContextCleared {
        /// User whose context ended
        user_id: String,
        /// `explicit` or `expired`
        reason: String,
    },
}

/// Bounded fire-and-forget outbox.
///
/// `try_send` semantics: when the consumer is slow or absent the event is
/// dropped and counted, never awaited. Cloning shares the channel and the
/// counter.
#[derive(Debug, Clone)]
pub struct Outbox<T> {
    tx: Option<mpsc::Sender<T>>,
    dropped: Arc<AtomicU64>,
}

impl<T: Send + 'static> Outbox<T> {
    /// Create an outbox and the receiver an external consumer drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Outbox {
                tx: Some(tx),
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// An outbox with no consumer; every event counts as dropped.
    ///
    /// Used when the embedding application wires no sink.
    pub fn detached() -> Self {
        Outbox {
            tx: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event without blocking; drops (and counts) on overflow
    pub fn emit(&self, event: T) {
        let Some(tx) = &self.tx else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if let Err(error) = tx.try_send(event) {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            match error {
                mpsc::error::TrySendError::Full(_) => {
                    warn!(dropped_total = total, "outbox full, event dropped");
                }
                mpsc::error::TrySendError::Closed(_) => {}
            }
        }
    }

    /// Number of events dropped since creation
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
