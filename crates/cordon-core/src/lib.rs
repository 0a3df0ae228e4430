//! Cordon Core - Foundation of the classified object store
//!
//! This crate provides the pure foundation types shared by every other
//! Cordon crate: the classification lattice, security labels, the record
//! model (normal and polyinstantiated), the unified error type, and the
//! injectable time/randomness effects used for deterministic testing.
//!
//! ## Core Concepts
//!
//! - **Classification Lattice**: a totally ordered set of classification
//!   levels plus unordered compartment tags. Dominance over `(level,
//!   compartments)` pairs drives every access decision in the system.
//! - **Security Labels**: `(level, compartments)` attached to subjects and
//!   stored objects. Unknown level strings are unrankable and fail closed.
//! - **Records**: a stored object is either a normal labeled record or one
//!   instance of a polyinstantiated logical entity (one instance per
//!   classification level).
//! - **Effects**: time and randomness are injected so tests and simulations
//!   are reproducible.
//!
//! ## What's NOT in this crate
//!
//! - Access decisions (see `cordon-mac`)
//! - Cryptography (see `cordon-crypto`)
//! - Storage composition (see `cordon-store`)

#![forbid(unsafe_code)]

/// Classification levels and compartment set operations
pub mod lattice;

/// Security labels attached to subjects and objects
pub mod label;

/// Normal and polyinstantiated record model
pub mod record;

/// Unified error handling
pub mod errors;

/// Injectable time and randomness effects
pub mod effects;

pub use effects::{Effects, RandomSource, SimulatedTimeSource, SystemTimeSource, TimeSource};
pub use errors::{CordonError, Result};
pub use label::SecurityLabel;
pub use lattice::{dominates, normalize_compartments, subset_of, superset_of, ClassificationLevel};
pub use record::{NormalRecord, PolyRecord, Record, RecordShape};
