//! Cordon Store - composed MAC-enforcing encrypted storage
//!
//! This crate assembles the enforcement-wrapped storage instance: a
//! profile-selected stack of security, crypto, validation, and sync
//! modules around a primitive persistence adapter. Every operation runs
//! the mandatory access check first, seals or opens payloads through the
//! classification crypto router, and returns inside a timing-safe
//! envelope so denials, absences, and slow crypto are indistinguishable
//! by latency.
//!
//! ## Core Components
//!
//! - **Persistence adapter**: the external key/value boundary
//!   (`PersistenceAdapter`), with an in-memory implementation.
//! - **Profiles & loader**: clearance-driven stack selection over a
//!   closed module registry; `StorageLoader` builds `ComposedStorage`
//!   with a fixed initialization order.
//! - **Composed storage**: put/get/delete/query/history with
//!   polyinstantiation (one instance per `(logical_id, level)`) and the
//!   deterministic classified-view merge.
//! - **Access guard**: the composable security facade. MAC first and
//!   non-bypassable, then a TTL'd, bounded, epoch-invalidated RBAC
//!   decision cache, plus an advisory constant-time access hint.
//! - **Audit & events**: bounded in-memory audit ring and bounded
//!   fire-and-forget outboxes with dropped-event counters.

#![forbid(unsafe_code)]

/// Persistence adapter boundary and the in-memory implementation
pub mod adapter;

/// Storage options and the authentication context
pub mod config;

/// Bounded fire-and-forget notification outboxes
pub mod events;

/// Audit events and the bounded in-memory ring
pub mod audit;

/// Profile selection and the closed module registry
pub mod profile;

/// Composable security facade: MAC gate, decision cache, access hints
pub mod guard;

/// Polyinstantiation merge algorithm
pub mod merge;

/// Timing-safe operation envelope
pub mod timing;

/// Input schema validation
pub mod validation;

/// Optional change-queue sync module
pub mod sync;

/// Stack assembly
pub mod loader;

/// Composed storage operations
pub mod storage;

pub use adapter::{MemoryAdapter, PersistenceAdapter, Row};
pub use audit::{AuditEvent, AuditKind, AuditLog};
pub use config::{AuthContext, StorageOptions};
pub use events::{Notification, Outbox};
pub use guard::AccessGuard;
pub use loader::{LoaderSinks, StorageLoader};
pub use profile::StorageProfile;
pub use storage::{ComposedStorage, EntityView};
pub use sync::{ChangeKind, SyncChange, SyncModule};
pub use validation::SchemaValidator;
