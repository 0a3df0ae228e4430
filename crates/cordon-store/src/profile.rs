//! Storage profiles and the closed module registry
//!
//! Stack selection is a pure function of `(demo_mode, clearance_level,
//! feature flags)`. Each profile names concrete module identifiers; the
//! registry maps identifiers to constructors from a closed set resolved
//! at most once per loader. A missing optional extra is a warning; a
//! missing primary security or crypto module is fatal.

use crate::config::StorageOptions;
use cordon_core::{ClassificationLevel, CordonError, Result};
use cordon_crypto::{AesGcmCipher, DemoCipher, EnvelopeCipher, XChaChaCipher};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Security module: full Bell-LaPadula enforcement
pub const SECURITY_MAC: &str = "security.mac";
/// Security module: demo-only permissive gate
pub const SECURITY_PERMISSIVE: &str = "security.permissive";
/// Crypto module: AES-256-GCM envelopes
pub const CRYPTO_AES_GCM: &str = "crypto.aes_gcm";
/// Crypto module: XChaCha20-Poly1305 envelopes
pub const CRYPTO_XCHACHA: &str = "crypto.xchacha";
/// Crypto module: demo passthrough
pub const CRYPTO_DEMO: &str = "crypto.demo";
/// Validation extra: schema checks before MAC/crypto
pub const VALIDATION_SCHEMA: &str = "validation.schema";
/// Sync extra: change queue for an external replicator
pub const SYNC_QUEUE: &str = "sync.queue";

/// Named security/crypto stack selected for one storage instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProfile {
    /// Minimal insecure stack; never selected unless demo mode is on
    Demo,
    /// Default stack for low clearances
    Basic,
    /// Hardened stack for confidential-and-above clearances
    HighSecurity,
    /// NATO-caveat stack
    Nato,
}

impl StorageProfile {
    /// Resolve a profile from the authentication context.
    ///
    /// Demo mode always wins. Otherwise the ordered classifier maps the
    /// clearance string upward: NATO tiers select the NATO profile,
    /// confidential and above select high security, and everything else,
    /// including unknown clearance strings, the basic profile.
    pub fn resolve(demo_mode: bool, clearance_level: &str) -> StorageProfile {
        if demo_mode {
            return StorageProfile::Demo;
        }
        match clearance_level.parse::<ClassificationLevel>() {
            Ok(level) if level.is_nato_tier() => StorageProfile::Nato,
            Ok(level) if level >= ClassificationLevel::Confidential => {
                StorageProfile::HighSecurity
            }
            Ok(_) => StorageProfile::Basic,
            Err(_) => {
                warn!(
                    clearance_level,
                    "unknown clearance string, selecting basic profile"
                );
                StorageProfile::Basic
            }
        }
    }

    /// The module identifiers this profile names
    pub fn plan(self, options: &StorageOptions) -> StackPlan {
        match self {
            StorageProfile::Demo => StackPlan {
                profile: self,
                security: SECURITY_PERMISSIVE,
                crypto: CRYPTO_DEMO,
                validation: None,
                sync: None,
            },
            StorageProfile::Basic => StackPlan {
                profile: self,
                security: SECURITY_MAC,
                crypto: CRYPTO_AES_GCM,
                validation: options.strict_validation.then_some(VALIDATION_SCHEMA),
                sync: options.enable_sync.then_some(SYNC_QUEUE),
            },
            StorageProfile::HighSecurity | StorageProfile::Nato => StackPlan {
                profile: self,
                security: SECURITY_MAC,
                crypto: CRYPTO_XCHACHA,
                validation: Some(VALIDATION_SCHEMA),
                sync: options.enable_sync.then_some(SYNC_QUEUE),
            },
        }
    }
}

/// Concrete module identifiers for one storage instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackPlan {
    /// Profile that produced this plan
    pub profile: StorageProfile,
    /// Primary security module (fatal if unresolvable)
    pub security: &'static str,
    /// Primary crypto module (fatal if unresolvable)
    pub crypto: &'static str,
    /// Optional validation extra
    pub validation: Option<&'static str>,
    /// Optional sync extra
    pub sync: Option<&'static str>,
}

/// Whether the access gate enforces or waves through (demo only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityMode {
    /// Full MAC + RBAC enforcement
    Enforcing,
    /// Demo-only: every access allowed, still audited
    Permissive,
}

type CipherFactory = fn() -> Arc<dyn EnvelopeCipher>;

static CIPHER_REGISTRY: Lazy<HashMap<&'static str, CipherFactory>> = Lazy::new(|| {
    let mut registry: HashMap<&'static str, CipherFactory> = HashMap::new();
    registry.insert(CRYPTO_AES_GCM, || Arc::new(AesGcmCipher));
    registry.insert(CRYPTO_XCHACHA, || Arc::new(XChaChaCipher));
    registry.insert(CRYPTO_DEMO, || Arc::new(DemoCipher));
    registry
});

static SECURITY_REGISTRY: Lazy<HashMap<&'static str, SecurityMode>> = Lazy::new(|| {
    let mut registry = HashMap::new();
    registry.insert(SECURITY_MAC, SecurityMode::Enforcing);
    registry.insert(SECURITY_PERMISSIVE, SecurityMode::Permissive);
    registry
});

/// Resolve a crypto module id; unresolvable is fatal
pub fn resolve_cipher(id: &str) -> Result<Arc<dyn EnvelopeCipher>> {
    CIPHER_REGISTRY
        .get(id)
        .map(|factory| factory())
        .ok_or_else(|| {
            CordonError::module_resolution(format!("Unknown crypto module {id:?}"))
        })
}

/// Resolve a security module id; unresolvable is fatal
pub fn resolve_security(id: &str) -> Result<SecurityMode> {
    SECURITY_REGISTRY.get(id).copied().ok_or_else(|| {
        CordonError::module_resolution(format!("Unknown security module {id:?}"))
    })
}

/// Resolve an optional extra module id.
///
/// Unknown extras log a warning and resolve to nothing; they never abort
/// initialization and never disable the primary security or crypto
/// modules.
pub fn resolve_extra(id: &str) -> Option<&'static str> {
    match id {
        VALIDATION_SCHEMA => Some(VALIDATION_SCHEMA),
        SYNC_QUEUE => Some(SYNC_QUEUE),
        other => {
            warn!(module = other, "optional module not found, continuing without it");
            None
        }
    }
}
