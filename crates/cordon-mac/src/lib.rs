//! Cordon MAC - Bell-LaPadula mandatory access control
//!
//! This crate holds the mandatory access control engine (no read-up, no
//! write-down against the classification lattice) and the security context
//! that tracks the authenticated subject's label.
//!
//! ## Core Concepts
//!
//! - **MAC Engine**: pure read/write/delete checks over subject and object
//!   labels, with enforcing variants that raise distinguishable denials.
//! - **Security Context**: at most one live subject per context handle;
//!   absent or expired context degrades to the least-privileged public
//!   label, never to an implicit superuser.
//! - **Epoch**: every context change bumps a counter that downstream
//!   decision caches key on, so a context change invalidates them
//!   wholesale.
//!
//! ## What's NOT in this crate
//!
//! - Cryptography (see `cordon-crypto`)
//! - Storage composition and the decision cache (see `cordon-store`)

#![forbid(unsafe_code)]

/// Bell-LaPadula read/write/delete checks
pub mod engine;

/// Authenticated subject state machine
pub mod context;

pub use context::{ClearReason, ContextObserver, SecurityContext, Subject};
pub use engine::MacEngine;
