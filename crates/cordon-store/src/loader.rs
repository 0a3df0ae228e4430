//! Storage loader
//!
//! Resolves the module stack named by the authentication context and
//! options, then assembles a `ComposedStorage` around the persistence
//! adapter. Sub-modules initialize in a fixed order (adapter, crypto,
//! security, validation, sync) because later modules depend on earlier
//! ones being ready. Primary module resolution failures are fatal;
//! optional extras degrade to warnings.

use crate::adapter::PersistenceAdapter;
use crate::audit::{AuditEvent, AuditKind, AuditLog};
use crate::config::{AuthContext, StorageOptions};
use crate::events::{Notification, Outbox};
use crate::guard::AccessGuard;
use crate::profile::{self, StorageProfile};
use crate::storage::ComposedStorage;
use crate::sync::{SyncChange, SyncModule};
use crate::validation::SchemaValidator;
use cordon_core::{Effects, Result, SecurityLabel};
use cordon_crypto::{ClassificationCrypto, EnvelopeCipher, Keyring};
use cordon_mac::{ClearReason, ContextObserver, SecurityContext};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// External consumers of the storage instance's outbound events
#[derive(Debug)]
pub struct LoaderSinks {
    /// Notification bus consumer (event/rule engine)
    pub notifications: Outbox<Notification>,
    /// Audit/forensic sink
    pub audit: Outbox<AuditEvent>,
    /// Realtime sync consumer, if any
    pub sync: Option<Outbox<SyncChange>>,
}

impl Default for LoaderSinks {
    fn default() -> Self {
        LoaderSinks {
            notifications: Outbox::detached(),
            audit: Outbox::detached(),
            sync: None,
        }
    }
}

/// Forwards security-context transitions to the notification bus and
/// the audit ring.
struct ContextEventForwarder {
    notifications: Outbox<Notification>,
    audit: Arc<AuditLog>,
    effects: Effects,
}

impl ContextObserver for ContextEventForwarder {
    fn context_set(&self, user_id: &str, label: &SecurityLabel) {
        let at = self.effects.now().unwrap_or(0);
        self.audit.record(
            at,
            AuditKind::ContextSet,
            json!({ "user_id": user_id, "label": label.to_string() }),
        );
        self.notifications.emit(Notification::SecurityContextSet {
            user_id: user_id.to_string(),
            label: label.to_string(),
        });
    }

    fn context_cleared(&self, user_id: &str, reason: ClearReason) {
        let at = self.effects.now().unwrap_or(0);
        let reason = match reason {
            ClearReason::Explicit => "explicit",
            ClearReason::Expired => "expired",
        };
        self.audit.record(
            at,
            AuditKind::ContextCleared,
            json!({ "user_id": user_id, "reason": reason }),
        );
        self.notifications.emit(Notification::SecurityContextCleared {
            user_id: user_id.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Assembles composed storage instances from profile-selected modules.
///
/// Module constructors resolve through the closed registry at most once
/// per loader; repeated loads reuse the cached resolution.
pub struct StorageLoader {
    effects: Effects,
    resolved_ciphers: Mutex<HashMap<&'static str, Arc<dyn EnvelopeCipher>>>,
}

impl StorageLoader {
    /// Create a loader
    pub fn new(effects: Effects) -> Self {
        StorageLoader {
            effects,
            resolved_ciphers: Mutex::new(HashMap::new()),
        }
    }

    /// Build a composed storage instance for the authenticated principal.
    ///
    /// The returned storage owns a fresh security context wired to the
    /// sinks; the application establishes the subject on it explicitly
    /// after authentication.
    pub fn load(
        &self,
        auth: &AuthContext,
        options: StorageOptions,
        adapter: Arc<dyn PersistenceAdapter>,
        sinks: LoaderSinks,
    ) -> Result<ComposedStorage> {
        let profile = StorageProfile::resolve(options.demo_mode, &auth.clearance_level);
        let plan = profile.plan(&options);
        info!(?profile, security = plan.security, crypto = plan.crypto, "loading storage stack");

        // 1. Persistence adapter: supplied ready by the caller.
        debug!("stack init: persistence adapter ready");

        // 2. Crypto: keyring plus the profile's cipher.
        let cipher = self.cipher(plan.crypto)?;
        let keyring = Arc::new(Keyring::new(self.effects.clone()));
        let crypto = Arc::new(ClassificationCrypto::new(
            keyring,
            cipher,
            self.effects.clone(),
        ));
        debug!(algorithm = crypto.algorithm(), "stack init: crypto ready");

        // 3. Security: audit ring, context, and the access guard.
        let mode = profile::resolve_security(plan.security)?;
        let audit = Arc::new(AuditLog::new(options.audit_capacity, sinks.audit));
        let context = SecurityContext::with_observer(
            self.effects.clone(),
            Arc::new(ContextEventForwarder {
                notifications: sinks.notifications.clone(),
                audit: Arc::clone(&audit),
                effects: self.effects.clone(),
            }),
        );
        let guard = Arc::new(AccessGuard::new(
            context.clone(),
            mode,
            auth,
            Arc::clone(&audit),
            sinks.notifications.clone(),
            &options,
            self.effects.clone(),
        ));
        debug!(?mode, "stack init: security ready");

        // 4. Validation extra.
        let validator = plan
            .validation
            .and_then(profile::resolve_extra)
            .map(|_| SchemaValidator::new(options.strict_validation));
        debug!(present = validator.is_some(), "stack init: validation ready");

        // 5. Sync extra.
        let sync = plan.sync.and_then(profile::resolve_extra).map(|_| {
            let capacity = options.notification_capacity;
            match (options.realtime_sync, sinks.sync) {
                (true, Some(outbox)) => Arc::new(SyncModule::realtime(capacity, outbox)),
                _ => Arc::new(SyncModule::new(capacity)),
            }
        });
        debug!(present = sync.is_some(), "stack init: sync ready");

        Ok(ComposedStorage::assemble(
            profile,
            adapter,
            crypto,
            guard,
            context,
            validator,
            sync,
            audit,
            sinks.notifications,
            options,
            self.effects.clone(),
        ))
    }

    /// Resolve a cipher id through the registry, caching the resolution
    fn cipher(&self, id: &'static str) -> Result<Arc<dyn EnvelopeCipher>> {
        let mut resolved = self
            .resolved_ciphers
            .lock()
            .map_err(|e| cordon_core::CordonError::internal(format!("Loader lock poisoned: {e}")))?;
        if let Some(cipher) = resolved.get(id) {
            return Ok(Arc::clone(cipher));
        }
        let cipher = profile::resolve_cipher(id)?;
        resolved.insert(id, Arc::clone(&cipher));
        Ok(cipher)
    }
}

impl std::fmt::Debug for StorageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageLoader").finish()
    }
}
