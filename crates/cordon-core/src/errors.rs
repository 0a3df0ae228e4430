//! Unified error system for Cordon
//!
//! A single error type covers every operation in the workspace. Mandatory
//! access control denials, composed-policy denials, and cryptographic
//! authentication failures are distinct variants so callers and audit sinks
//! can tell them apart, while still flowing through one `Result` alias.

use serde::{Deserialize, Serialize};

/// Unified error type for all Cordon operations
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum CordonError {
    /// Mandatory policy denied a read (no read-up)
    #[error("MAC read denied: {message}")]
    MacDenyRead {
        /// What was denied and why
        message: String,
    },

    /// Mandatory policy denied a write (no write-down)
    #[error("MAC write denied: {message}")]
    MacDenyWrite {
        /// What was denied and why
        message: String,
    },

    /// Mandatory policy denied a delete (delete is a write)
    #[error("MAC delete denied: {message}")]
    MacDenyDelete {
        /// What was denied and why
        message: String,
    },

    /// Composed-policy (RBAC layer) denial
    #[error("Access denied: {message}")]
    AccessDenied {
        /// What was denied and why
        message: String,
    },

    /// Authenticated decryption failed (AAD mismatch or corrupted ciphertext)
    #[error("Crypto authentication failed: {message}")]
    CryptoAuthentication {
        /// Failure description; never includes partial plaintext
        message: String,
    },

    /// A required stack module could not be resolved at load time
    #[error("Module resolution failed: {message}")]
    ModuleResolution {
        /// Which module id failed and for which profile
        message: String,
    },

    /// Malformed input entity rejected before any MAC/crypto work
    #[error("Schema validation failed: {message}")]
    SchemaValidation {
        /// Which constraint the entity violated
        message: String,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Cryptographic operation failed for a non-authentication reason
    #[error("Crypto error: {message}")]
    Crypto {
        /// Error message describing the cryptographic failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl CordonError {
    /// Create a MAC read denial
    pub fn mac_deny_read(message: impl Into<String>) -> Self {
        Self::MacDenyRead {
            message: message.into(),
        }
    }

    /// Create a MAC write denial
    pub fn mac_deny_write(message: impl Into<String>) -> Self {
        Self::MacDenyWrite {
            message: message.into(),
        }
    }

    /// Create a MAC delete denial
    pub fn mac_deny_delete(message: impl Into<String>) -> Self {
        Self::MacDenyDelete {
            message: message.into(),
        }
    }

    /// Create a composed-policy denial
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Create a crypto authentication failure
    pub fn crypto_authentication(message: impl Into<String>) -> Self {
        Self::CryptoAuthentication {
            message: message.into(),
        }
    }

    /// Create a module resolution failure
    pub fn module_resolution(message: impl Into<String>) -> Self {
        Self::ModuleResolution {
            message: message.into(),
        }
    }

    /// Create a schema validation failure
    pub fn schema_validation(message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for any denial produced by the mandatory or composed policy.
    ///
    /// Denials are surfaced identically to the caller (after timing
    /// padding) but remain separately auditable.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::MacDenyRead { .. }
                | Self::MacDenyWrite { .. }
                | Self::MacDenyDelete { .. }
                | Self::AccessDenied { .. }
        )
    }
}

/// Standard Result type for Cordon operations
pub type Result<T> = std::result::Result<T, CordonError>;

impl From<serde_json::Error> for CordonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for CordonError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::access_denied(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}
