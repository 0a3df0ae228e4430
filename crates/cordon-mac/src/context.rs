//! Security context: the authenticated subject's label
//!
//! State machine: `Unauthenticated → Authenticated → (Expired |
//! ClearedExplicitly) → Unauthenticated`. At most one live subject exists
//! per context handle. While no subject is live the context behaves as the
//! least-privileged public subject.
//!
//! Every transition bumps an epoch counter; downstream decision caches key
//! their entries on the epoch so any context change invalidates them
//! wholesale without coordination.

use cordon_core::{
    ClassificationLevel, CordonError, Effects, Result, SecurityLabel,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// Why a subject left the authenticated state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// Explicit logout
    Explicit,
    /// TTL elapsed, cleared by the expiry sweep
    Expired,
}

/// An authenticated subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Authenticated user identifier
    pub user_id: String,
    /// Clearance label granted at authentication
    pub label: SecurityLabel,
    /// Unix timestamp after which this subject is no longer live
    pub expires_at: u64,
}

impl Subject {
    /// True once the subject's TTL has elapsed
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Observer for context transitions.
///
/// The storage layer wires its notification bus in through this seam;
/// the context itself does not know who listens.
pub trait ContextObserver: Send + Sync {
    /// A subject was set (context established or overwritten)
    fn context_set(&self, user_id: &str, label: &SecurityLabel);
    /// The live subject was cleared
    fn context_cleared(&self, user_id: &str, reason: ClearReason);
}

/// No-op observer used when nothing is wired in
#[derive(Debug, Default)]
struct NullObserver;

impl ContextObserver for NullObserver {
    fn context_set(&self, _user_id: &str, _label: &SecurityLabel) {}
    fn context_cleared(&self, _user_id: &str, _reason: ClearReason) {}
}

/// Holder of the authenticated subject's label.
///
/// Cheaply cloneable handle; all clones share the same subject state and
/// epoch counter.
#[derive(Clone)]
pub struct SecurityContext {
    subject: Arc<RwLock<Option<Subject>>>,
    epoch: Arc<AtomicU64>,
    observer: Arc<dyn ContextObserver>,
    effects: Effects,
}

impl SecurityContext {
    /// Create an unauthenticated context
    pub fn new(effects: Effects) -> Self {
        Self::with_observer(effects, Arc::new(NullObserver))
    }

    /// Create an unauthenticated context with a transition observer
    pub fn with_observer(effects: Effects, observer: Arc<dyn ContextObserver>) -> Self {
        SecurityContext {
            subject: Arc::new(RwLock::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
            observer,
            effects,
        }
    }

    /// Establish the authenticated subject after login.
    ///
    /// Requires a non-empty user id and a rankable level; overwrites any
    /// existing subject and invalidates downstream decision caches by
    /// bumping the epoch.
    pub fn set_context<I, S>(
        &self,
        user_id: &str,
        level: &str,
        compartments: I,
        ttl: Duration,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if user_id.trim().is_empty() {
            return Err(CordonError::invalid("Security context requires a user id"));
        }
        let level: ClassificationLevel = level.parse()?;
        let label = SecurityLabel::new(level, compartments);
        let now = self.effects.now()?;
        let subject = Subject {
            user_id: user_id.to_string(),
            label: label.clone(),
            expires_at: now.saturating_add(ttl.as_secs()),
        };

        {
            let mut guard = self
                .subject
                .write()
                .map_err(|e| CordonError::internal(format!("Context lock poisoned: {e}")))?;
            *guard = Some(subject);
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        info!(user_id, label = %label, "security context set");
        self.observer.context_set(user_id, &label);
        Ok(())
    }

    /// Explicitly clear the live subject (logout)
    pub fn clear_context(&self) -> Result<()> {
        self.clear(ClearReason::Explicit)
    }

    /// The live subject, if one exists and has not expired
    pub fn subject(&self) -> Option<Subject> {
        let guard = self.subject.read().ok()?;
        let subject = guard.as_ref()?;
        let now = self.effects.now().ok()?;
        if subject.is_expired(now) {
            None
        } else {
            Some(subject.clone())
        }
    }

    /// The subject's label. Never fails: absent or expired context yields
    /// the least-privileged label.
    pub fn subject_label(&self) -> SecurityLabel {
        self.subject()
            .map(|s| s.label)
            .unwrap_or_else(SecurityLabel::least_privileged)
    }

    /// The authenticated user id, if a subject is live
    pub fn user_id(&self) -> Option<String> {
        self.subject().map(|s| s.user_id)
    }

    /// Current context epoch; bumped on every set or clear
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Run one expiry check: clear the subject if its TTL has elapsed.
    ///
    /// Returns true when a subject was expired and cleared.
    pub fn sweep_once(&self) -> Result<bool> {
        let expired = {
            let guard = self
                .subject
                .read()
                .map_err(|e| CordonError::internal(format!("Context lock poisoned: {e}")))?;
            match guard.as_ref() {
                Some(subject) => subject.is_expired(self.effects.now()?),
                None => false,
            }
        };
        if expired {
            self.clear(ClearReason::Expired)?;
        }
        Ok(expired)
    }

    /// Spawn a background task that sweeps for expiry at a fixed interval.
    ///
    /// The task runs until aborted; transitions it makes are observable
    /// through the observer like any explicit clear.
    pub fn spawn_expiry_sweep(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let context = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; skip it so the sweep waits a
            // full interval before the first check.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = context.sweep_once() {
                    debug!(%error, "expiry sweep check failed");
                }
            }
        })
    }

    fn clear(&self, reason: ClearReason) -> Result<()> {
        let previous = {
            let mut guard = self
                .subject
                .write()
                .map_err(|e| CordonError::internal(format!("Context lock poisoned: {e}")))?;
            guard.take()
        };
        if let Some(subject) = previous {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            info!(user_id = %subject.user_id, ?reason, "security context cleared");
            self.observer.context_cleared(&subject.user_id, reason);
        }
        Ok(())
    }
}

impl std::fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityContext")
            .field("epoch", &self.epoch())
            .field("authenticated", &self.subject().is_some())
            .finish()
    }
}
