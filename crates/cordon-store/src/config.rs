//! Storage configuration
//!
//! `StorageOptions` is the knob surface for one composed storage
//! instance; `AuthContext` is the authentication result handed in at
//! creation time and drives stack selection.

use cordon_core::{CordonError, Result};
use serde::{Deserialize, Serialize};

/// Authentication context provided at storage-creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Clearance level string (drives profile selection; unknown strings
    /// fall back to the basic profile, never a higher one)
    pub clearance_level: String,
    /// Compartment tags held by the authenticated principal
    #[serde(default)]
    pub compartments: Vec<String>,
}

impl AuthContext {
    /// Convenience constructor
    pub fn new(clearance_level: impl Into<String>, compartments: Vec<String>) -> Self {
        AuthContext {
            clearance_level: clearance_level.into(),
            compartments,
        }
    }
}

/// Options for one composed storage instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// Disable MAC and crypto entirely. Non-production use only; forces
    /// the minimal insecure stack regardless of clearance.
    pub demo_mode: bool,
    /// Reject malformed entities before any MAC or crypto work
    pub strict_validation: bool,
    /// Attach the optional change-queue sync module
    pub enable_sync: bool,
    /// Forward sync changes eagerly instead of queueing only
    pub realtime_sync: bool,
    /// Maximum entries in the access-decision cache
    pub decision_cache_capacity: usize,
    /// Decision cache entry lifetime in seconds
    pub decision_cache_ttl_secs: u64,
    /// Latency floor in milliseconds for label-dependent operations
    pub timing_floor_ms: u64,
    /// Maximum events retained in the in-memory audit ring
    pub audit_capacity: usize,
    /// Bound of the outbound notification channel
    pub notification_capacity: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        StorageOptions {
            demo_mode: false,
            strict_validation: false,
            enable_sync: false,
            realtime_sync: false,
            decision_cache_capacity: 256,
            decision_cache_ttl_secs: 300,
            timing_floor_ms: 100,
            audit_capacity: 512,
            notification_capacity: 256,
        }
    }
}

impl StorageOptions {
    /// Parse options from a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input)
            .map_err(|e| CordonError::invalid(format!("Invalid storage options: {e}")))
    }
}
