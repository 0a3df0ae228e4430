//! Composable security facade
//!
//! Every access runs a sequential, non-short-circuitable gate:
//!
//! 1. the mandatory Bell-LaPadula check against the entity's raw label;
//!    a denial here ends the decision, the second layer is never
//!    consulted;
//! 2. an RBAC-style check of the creation-time clearance against the
//!    entity's required classification, using the same dominance rules,
//!    cached per `(classification, sorted compartments)` with a TTL,
//!    bounded in entries (oldest evicted first), and invalidated
//!    wholesale whenever the security context changes.
//!
//! An advisory access hint (keyed hash of the crypto domain, compared in
//! constant time) travels with the data and is recorded with each
//! decision; it never substitutes for the gate.

use crate::audit::{AuditKind, AuditLog};
use crate::config::{AuthContext, StorageOptions};
use crate::events::{Notification, Outbox};
use crate::profile::SecurityMode;
use cordon_core::{CordonError, Effects, Result, SecurityLabel};
use cordon_crypto::crypto_domain;
use cordon_mac::{MacEngine, SecurityContext};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use subtle::ConstantTimeEq;
use tracing::debug;

/// Version prefix for hint derivation
const HINT_CONTEXT: &[u8] = b"cordon-access-hint-v1:";

struct CacheEntry {
    allowed: bool,
    expires_at: u64,
}

/// Bounded, TTL'd decision cache keyed by the entity's crypto domain.
///
/// The epoch mirrors the security context's: any context change makes
/// every cached decision stale at once.
struct DecisionCache {
    epoch: u64,
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl DecisionCache {
    fn new() -> Self {
        DecisionCache {
            epoch: 0,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn sync_epoch(&mut self, epoch: u64) {
        if self.epoch != epoch {
            self.entries.clear();
            self.order.clear();
            self.epoch = epoch;
        }
    }

    fn lookup(&self, key: &str, now: u64) -> Option<bool> {
        self.entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.allowed)
    }

    fn insert(&mut self, key: String, allowed: bool, expires_at: u64, capacity: usize) {
        while self.entries.len() >= capacity.max(1) {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.entries.insert(
            key.clone(),
            CacheEntry {
                allowed,
                expires_at,
            },
        );
        self.order.push_back(key);
    }
}

/// Access-decision facade combining the MAC gate with a cached RBAC
/// layer and an advisory access hint.
pub struct AccessGuard {
    context: SecurityContext,
    mode: SecurityMode,
    auth_label: SecurityLabel,
    cache: Mutex<DecisionCache>,
    audit: std::sync::Arc<AuditLog>,
    notifications: Outbox<Notification>,
    hint_key: [u8; 32],
    ttl_secs: u64,
    capacity: usize,
    effects: Effects,
}

impl AccessGuard {
    /// Build a guard for one storage instance.
    ///
    /// The RBAC layer compares against the creation-time clearance; an
    /// unparseable clearance string degrades to the least-privileged
    /// label rather than erroring (fail closed).
    pub fn new(
        context: SecurityContext,
        mode: SecurityMode,
        auth: &AuthContext,
        audit: std::sync::Arc<AuditLog>,
        notifications: Outbox<Notification>,
        options: &StorageOptions,
        effects: Effects,
    ) -> Self {
        let auth_label = match auth.clearance_level.parse() {
            Ok(level) => SecurityLabel::new(level, auth.compartments.iter()),
            Err(_) => SecurityLabel::least_privileged(),
        };
        AccessGuard {
            context,
            mode,
            auth_label,
            cache: Mutex::new(DecisionCache::new()),
            audit,
            notifications,
            hint_key: effects.random_bytes(),
            ttl_secs: options.decision_cache_ttl_secs,
            capacity: options.decision_cache_capacity,
            effects,
        }
    }

    /// The security context this guard decides under
    pub fn context(&self) -> &SecurityContext {
        &self.context
    }

    /// Opaque access hint for a label: keyed hash of its crypto domain.
    ///
    /// Equal hints mean equal domains and nothing more; the hint is
    /// advisory defense in depth, recorded with decisions but never a
    /// substitute for the gate.
    pub fn access_hint(&self, label: &SecurityLabel) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_keyed(&self.hint_key);
        hasher.update(HINT_CONTEXT);
        hasher.update(crypto_domain(label).as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Constant-time comparison of a data-carried hint against the
    /// subject's own hint
    pub fn hint_matches(&self, data_hint: &[u8]) -> bool {
        let subject_hint = self.access_hint(&self.context.subject_label());
        if data_hint.len() != subject_hint.len() {
            return false;
        }
        subject_hint.ct_eq(data_hint).into()
    }

    /// Gate a read of an entity labeled `object`.
    ///
    /// MAC first and non-bypassable, then the cached RBAC layer. A
    /// denial from either layer is audited and notified with its layer
    /// name before the error propagates.
    pub fn check_read(&self, object: &SecurityLabel, data_hint: Option<&[u8]>) -> Result<()> {
        let now = self.effects.now()?;
        if self.mode == SecurityMode::Permissive {
            self.record_granted(now, object, "demo", data_hint);
            return Ok(());
        }

        let subject = self.context.subject_label();
        if !MacEngine::can_read(&subject, object) {
            self.record_denied(now, &subject, object, "mac");
            return Err(CordonError::mac_deny_read(format!(
                "subject {subject} does not dominate object {object}"
            )));
        }

        if !self.rbac_allows(object, now)? {
            self.record_denied(now, &subject, object, "rbac");
            return Err(CordonError::access_denied(format!(
                "clearance {} does not cover classification {object}",
                self.auth_label
            )));
        }

        self.record_granted(now, object, "mac+rbac", data_hint);
        Ok(())
    }

    /// Gate a write of an entity labeled `object` (MAC: no write-down)
    pub fn check_write(&self, object: &SecurityLabel) -> Result<()> {
        let now = self.effects.now()?;
        if self.mode == SecurityMode::Permissive {
            self.record_granted(now, object, "demo", None);
            return Ok(());
        }
        let subject = self.context.subject_label();
        match MacEngine::enforce_write(&subject, object) {
            Ok(()) => {
                self.record_granted(now, object, "mac", None);
                Ok(())
            }
            Err(error) => {
                self.record_denied(now, &subject, object, "mac");
                Err(error)
            }
        }
    }

    /// Gate deletion of an existing entity labeled `object`
    pub fn check_delete(&self, object: &SecurityLabel) -> Result<()> {
        let now = self.effects.now()?;
        if self.mode == SecurityMode::Permissive {
            self.record_granted(now, object, "demo", None);
            return Ok(());
        }
        let subject = self.context.subject_label();
        match MacEngine::enforce_delete(&subject, object) {
            Ok(()) => {
                self.record_granted(now, object, "mac", None);
                Ok(())
            }
            Err(error) => {
                self.record_denied(now, &subject, object, "mac");
                Err(error)
            }
        }
    }

    /// Number of live cache entries (test and introspection use)
    pub fn cached_decisions(&self) -> usize {
        self.cache.lock().map(|cache| cache.entries.len()).unwrap_or(0)
    }

    /// RBAC layer: creation-time clearance must dominate the entity's
    /// required classification. Results are cached per entity domain.
    fn rbac_allows(&self, object: &SecurityLabel, now: u64) -> Result<bool> {
        let key = crypto_domain(object);
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| CordonError::internal(format!("Decision cache lock poisoned: {e}")))?;
        cache.sync_epoch(self.context.epoch());
        if let Some(allowed) = cache.lookup(&key, now) {
            debug!(domain = %key, allowed, "decision cache hit");
            return Ok(allowed);
        }
        let allowed = self.auth_label.dominates(object);
        cache.insert(
            key,
            allowed,
            now.saturating_add(self.ttl_secs),
            self.capacity,
        );
        Ok(allowed)
    }

    fn record_granted(
        &self,
        now: u64,
        object: &SecurityLabel,
        layer: &str,
        data_hint: Option<&[u8]>,
    ) {
        let subject = self.context.subject_label();
        let hint_match = data_hint.map(|hint| self.hint_matches(hint));
        self.audit.record(
            now,
            AuditKind::AccessGranted,
            json!({
                "subject": subject.to_string(),
                "object": object.to_string(),
                "layer": layer,
                "hint_match": hint_match,
            }),
        );
        self.notifications.emit(Notification::AccessGranted {
            subject: subject.to_string(),
            object: object.to_string(),
        });
    }

    fn record_denied(&self, now: u64, subject: &SecurityLabel, object: &SecurityLabel, layer: &str) {
        self.audit.record(
            now,
            AuditKind::AccessDenied,
            json!({
                "subject": subject.to_string(),
                "object": object.to_string(),
                "layer": layer,
            }),
        );
        self.notifications.emit(Notification::AccessDenied {
            subject: subject.to_string(),
            object: object.to_string(),
            layer: layer.to_string(),
        });
    }
}

impl std::fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard")
            .field("mode", &self.mode)
            .field("auth_label", &self.auth_label.to_string())
            .field("cached_decisions", &self.cached_decisions())
            .finish()
    }
}
