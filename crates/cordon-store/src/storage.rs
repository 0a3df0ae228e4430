//! Composed storage
//!
//! The enforcement-wrapped storage instance. Every operation validates
//! first, runs the mandatory access check before anything else touches
//! the row, seals or opens payloads through the classification crypto
//! router, and returns through the timing shield so denial, absence,
//! and slow crypto share one latency profile.
//!
//! Polyinstantiated entities keep one physical row per `(logical_id,
//! level)`; reads fetch every sibling, filter to what the subject
//! dominates, and merge into the most classified permitted view.

use crate::adapter::{PersistenceAdapter, Row};
use crate::audit::{AuditKind, AuditLog};
use crate::config::StorageOptions;
use crate::events::{Notification, Outbox};
use crate::guard::AccessGuard;
use crate::merge::merge_instances;
use crate::profile::StorageProfile;
use crate::sync::{ChangeKind, SyncChange, SyncModule};
use crate::timing::shielded;
use crate::validation::SchemaValidator;
use cordon_core::record::{
    poly_physical_key, FIELD_DATA, FIELD_ID, FIELD_LOGICAL_ID, FIELD_WRITTEN_AT,
};
use cordon_core::{
    record, CordonError, Effects, Record, RecordShape, Result, SecurityLabel,
};
use cordon_crypto::{AssociatedData, ClassificationCrypto, EncryptedEnvelope};
use cordon_mac::SecurityContext;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Row field carrying the advisory access hint
pub const FIELD_ACCESS_HINT: &str = "access_hint";

/// A decrypted, subject-visible view of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    /// Logical identifier (equals the physical key for normal records)
    pub id: String,
    /// Physical key of the base row
    pub physical_key: String,
    /// Label of the most classified instance contributing to this view
    pub label: SecurityLabel,
    /// Decrypted payload (merged for polyinstantiated reads)
    pub body: Map<String, Value>,
    /// Write timestamp of the base row
    pub written_at: u64,
    /// Merge timestamp, present only for merged polyinstantiated views
    pub merged_at: Option<u64>,
}

/// One readable, decrypted physical instance
struct OpenInstance {
    physical_key: String,
    label: SecurityLabel,
    body: Map<String, Value>,
    written_at: u64,
}

/// Enforcement-wrapped storage over a persistence adapter
pub struct ComposedStorage {
    profile: StorageProfile,
    adapter: Arc<dyn PersistenceAdapter>,
    crypto: Arc<ClassificationCrypto>,
    guard: Arc<AccessGuard>,
    context: SecurityContext,
    validator: Option<SchemaValidator>,
    sync: Option<Arc<SyncModule>>,
    audit: Arc<AuditLog>,
    notifications: Outbox<Notification>,
    options: StorageOptions,
    effects: Effects,
}

impl ComposedStorage {
    /// Assemble from loader-resolved modules; see `StorageLoader::load`
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        profile: StorageProfile,
        adapter: Arc<dyn PersistenceAdapter>,
        crypto: Arc<ClassificationCrypto>,
        guard: Arc<AccessGuard>,
        context: SecurityContext,
        validator: Option<SchemaValidator>,
        sync: Option<Arc<SyncModule>>,
        audit: Arc<AuditLog>,
        notifications: Outbox<Notification>,
        options: StorageOptions,
        effects: Effects,
    ) -> Self {
        ComposedStorage {
            profile,
            adapter,
            crypto,
            guard,
            context,
            validator,
            sync,
            audit,
            notifications,
            options,
            effects,
        }
    }

    /// The profile this instance was loaded with
    pub fn profile(&self) -> StorageProfile {
        self.profile
    }

    /// The cipher algorithm sealing payloads in this instance
    pub fn algorithm(&self) -> &'static str {
        self.crypto.algorithm()
    }

    /// The security context owning the subject
    pub fn context(&self) -> &SecurityContext {
        &self.context
    }

    /// The access guard (decision cache and hint introspection)
    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    /// The in-memory audit ring
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// The optional sync module
    pub fn sync(&self) -> Option<&SyncModule> {
        self.sync.as_deref()
    }

    fn floor(&self) -> Duration {
        Duration::from_millis(self.options.timing_floor_ms)
    }

    /// Persist an entity.
    ///
    /// Validation, then the mandatory write check, then sealing, then
    /// the adapter. Poly instances land at `{logical_id}-{level}`, so a
    /// same-level write overwrites and a different-level write creates a
    /// sibling instance.
    pub async fn put(&self, store: &str, entity: Record) -> Result<String> {
        shielded(self.floor(), self.put_inner(store, entity)).await
    }

    /// Read one entity. Polyinstantiated reads merge every readable
    /// instance; absence and denial both surface as not-found.
    pub async fn get(&self, store: &str, id: &str, shape: RecordShape) -> Result<EntityView> {
        shielded(self.floor(), self.get_inner(store, id, shape)).await
    }

    /// Delete an entity. For polyinstantiated entities, write-dominance
    /// is enforced on every readable instance before anything is
    /// removed; a single failure rejects the whole deletion.
    pub async fn delete(&self, store: &str, id: &str, shape: RecordShape) -> Result<Vec<String>> {
        shielded(self.floor(), self.delete_inner(store, id, shape)).await
    }

    /// All subject-readable rows matching an index value, decrypted
    pub async fn query_by_index(
        &self,
        store: &str,
        index: &str,
        value: &str,
    ) -> Result<Vec<EntityView>> {
        shielded(
            self.floor(),
            self.filter_rows(self.adapter.query_by_index(store, index, value)),
        )
        .await
    }

    /// Every subject-readable row in the store, decrypted
    pub async fn get_all(&self, store: &str) -> Result<Vec<EntityView>> {
        shielded(self.floor(), self.filter_rows(self.adapter.get_all(store))).await
    }

    /// Every subject-readable physical instance of a logical entity,
    /// newest first and unmerged, for audit and inspection use
    pub async fn get_history(&self, store: &str, logical_id: &str) -> Result<Vec<EntityView>> {
        shielded(self.floor(), self.history_inner(store, logical_id)).await
    }

    async fn put_inner(&self, store: &str, entity: Record) -> Result<String> {
        if let Some(validator) = &self.validator {
            validator.validate(&entity)?;
        }
        self.guard.check_write(entity.label())?;

        let now = self.effects.now()?;
        let physical_key = entity.physical_key();
        let label = entity.label().clone();
        let mut row = entity.to_row(now);

        let plaintext = serde_json::to_vec(&Value::Object(entity.body().clone()))?;
        let aad = AssociatedData {
            label: label.clone(),
            record_id: physical_key.clone(),
            written_at: now,
        };
        self.audit.record(
            now,
            AuditKind::EncryptAttempt,
            json!({ "key": physical_key, "label": label.to_string() }),
        );
        let envelope = self.crypto.encrypt(&label, &plaintext, &aad)?;
        row.insert(FIELD_DATA.to_string(), serde_json::to_value(&envelope)?);
        row.insert(
            FIELD_ACCESS_HINT.to_string(),
            Value::String(hex::encode(self.guard.access_hint(&label))),
        );

        let key = self.adapter.put(store, row).await?;
        self.audit.record(
            now,
            AuditKind::EntitySaved,
            json!({ "store": store, "key": key, "label": label.to_string() }),
        );
        self.notifications.emit(Notification::EntitySaved {
            store: store.to_string(),
            key: key.clone(),
            level: label.level.as_str().to_string(),
        });
        if let Some(sync) = &self.sync {
            sync.record_change(SyncChange {
                store: store.to_string(),
                key: key.clone(),
                kind: ChangeKind::Saved,
                at: now,
            });
        }
        Ok(key)
    }

    async fn get_inner(&self, store: &str, id: &str, shape: RecordShape) -> Result<EntityView> {
        match shape {
            RecordShape::PolyInstance => {
                let rows = self
                    .adapter
                    .query_by_index(store, FIELD_LOGICAL_ID, id)
                    .await?;
                let readable = self.open_readable(rows, RecordShape::PolyInstance)?;
                if readable.is_empty() {
                    return Err(CordonError::not_found(format!("Entity {id:?}")));
                }
                let now = self.effects.now()?;
                let base_written_at = readable.iter().map(|i| i.written_at).max().unwrap_or(now);
                let instances = readable
                    .into_iter()
                    .map(|instance| (instance.label, instance.body))
                    .collect();
                let (label, body) = merge_instances(instances, now)
                    .ok_or_else(|| CordonError::not_found(format!("Entity {id:?}")))?;
                Ok(EntityView {
                    id: id.to_string(),
                    physical_key: poly_physical_key(id, &label),
                    label,
                    body,
                    written_at: base_written_at,
                    merged_at: Some(now),
                })
            }
            RecordShape::Normal => {
                let row = self
                    .adapter
                    .get(store, id)
                    .await?
                    .ok_or_else(|| CordonError::not_found(format!("Entity {id:?}")))?;
                match self.open_row(&row, RecordShape::Normal) {
                    Ok(Some(instance)) => Ok(EntityView {
                        id: id.to_string(),
                        physical_key: instance.physical_key,
                        label: instance.label,
                        body: instance.body,
                        written_at: instance.written_at,
                        merged_at: None,
                    }),
                    // Denied reads are audited inside the guard but the
                    // caller sees the same not-found as a true absence.
                    Ok(None) => Err(CordonError::not_found(format!("Entity {id:?}"))),
                    Err(error) => Err(error),
                }
            }
        }
    }

    async fn delete_inner(
        &self,
        store: &str,
        id: &str,
        shape: RecordShape,
    ) -> Result<Vec<String>> {
        let now = self.effects.now()?;
        let targets: Vec<OpenInstance> = match shape {
            RecordShape::PolyInstance => {
                let rows = self
                    .adapter
                    .query_by_index(store, FIELD_LOGICAL_ID, id)
                    .await?;
                self.open_readable(rows, RecordShape::PolyInstance)?
            }
            RecordShape::Normal => {
                let row = self
                    .adapter
                    .get(store, id)
                    .await?
                    .ok_or_else(|| CordonError::not_found(format!("Entity {id:?}")))?;
                // Deletion is a write: the row need not be readable, only
                // overwritable, so the label comes straight off the row.
                let label = record::parse_row_label(&row, RecordShape::Normal)
                    .map_err(|_| CordonError::not_found(format!("Entity {id:?}")))?;
                vec![OpenInstance {
                    physical_key: id.to_string(),
                    label,
                    body: Map::new(),
                    written_at: 0,
                }]
            }
        };
        if targets.is_empty() {
            return Err(CordonError::not_found(format!("Entity {id:?}")));
        }

        // All-or-nothing: every instance must pass write-dominance
        // before any row is removed.
        for target in &targets {
            self.guard.check_delete(&target.label)?;
        }

        let mut keys = Vec::with_capacity(targets.len());
        for target in targets {
            self.adapter.delete(store, &target.physical_key).await?;
            keys.push(target.physical_key);
        }
        self.audit.record(
            now,
            AuditKind::EntityDeleted,
            json!({ "store": store, "keys": keys }),
        );
        self.notifications.emit(Notification::EntityDeleted {
            store: store.to_string(),
            keys: keys.clone(),
        });
        if let Some(sync) = &self.sync {
            for key in &keys {
                sync.record_change(SyncChange {
                    store: store.to_string(),
                    key: key.clone(),
                    kind: ChangeKind::Deleted,
                    at: now,
                });
            }
        }
        Ok(keys)
    }

    async fn history_inner(&self, store: &str, logical_id: &str) -> Result<Vec<EntityView>> {
        let rows = self
            .adapter
            .query_by_index(store, FIELD_LOGICAL_ID, logical_id)
            .await?;
        let mut instances = self.open_readable(rows, RecordShape::PolyInstance)?;
        instances.sort_by(|a, b| {
            b.written_at
                .cmp(&a.written_at)
                .then_with(|| b.label.level.rank().cmp(&a.label.level.rank()))
        });
        Ok(instances
            .into_iter()
            .map(|instance| EntityView {
                id: logical_id.to_string(),
                physical_key: instance.physical_key,
                label: instance.label,
                body: instance.body,
                written_at: instance.written_at,
                merged_at: None,
            })
            .collect())
    }

    /// Fetch, filter to readable, and decrypt a batch of rows. Shapes
    /// are inferred per row via the documented field-presence fallback.
    async fn filter_rows(
        &self,
        rows: impl std::future::Future<Output = Result<Vec<Row>>>,
    ) -> Result<Vec<EntityView>> {
        let rows = rows.await?;
        let mut views = Vec::new();
        for row in rows {
            let shape = if row.contains_key(record::FIELD_POLY_LEVEL) {
                RecordShape::PolyInstance
            } else {
                RecordShape::Normal
            };
            let logical_id = match shape {
                RecordShape::PolyInstance => row.get(FIELD_LOGICAL_ID),
                RecordShape::Normal => row.get(FIELD_ID),
            }
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
            if let Some(instance) = self.open_row(&row, shape)? {
                views.push(EntityView {
                    id: logical_id,
                    physical_key: instance.physical_key,
                    label: instance.label,
                    body: instance.body,
                    written_at: instance.written_at,
                    merged_at: None,
                });
            }
        }
        Ok(views)
    }

    /// Decode, access-check, and decrypt a batch of physical rows,
    /// dropping rows the subject may not read.
    fn open_readable(&self, rows: Vec<Row>, shape: RecordShape) -> Result<Vec<OpenInstance>> {
        let mut readable = Vec::new();
        for row in rows {
            if let Some(instance) = self.open_row(&row, shape)? {
                readable.push(instance);
            }
        }
        Ok(readable)
    }

    /// Open one row for the current subject.
    ///
    /// Returns `Ok(None)` for rows the subject may not read (including
    /// unrankable labels, which fail closed). Authentication failures
    /// while opening a readable row are fatal for the operation: a
    /// corrupted or substituted ciphertext never degrades to partial
    /// plaintext.
    fn open_row(&self, row: &Row, shape: RecordShape) -> Result<Option<OpenInstance>> {
        let physical_key = row
            .get(FIELD_ID)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let label = match record::parse_row_label(row, shape) {
            Ok(label) => label,
            Err(error) => {
                warn!(key = %physical_key, %error, "row label is unrankable, treating as unreadable");
                return Ok(None);
            }
        };

        let carried_hint = row
            .get(FIELD_ACCESS_HINT)
            .and_then(Value::as_str)
            .and_then(|h| hex::decode(h).ok());
        match self.guard.check_read(&label, carried_hint.as_deref()) {
            Ok(()) => {}
            Err(error) if error.is_denial() => {
                debug!(key = %physical_key, "read filtered by access gate");
                return Ok(None);
            }
            Err(error) => return Err(error),
        }

        let written_at = row
            .get(FIELD_WRITTEN_AT)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let envelope_value = row
            .get(FIELD_DATA)
            .cloned()
            .ok_or_else(|| CordonError::storage(format!("Row {physical_key:?} has no payload")))?;
        let envelope: EncryptedEnvelope = serde_json::from_value(envelope_value)?;
        self.audit.record(
            self.effects.now()?,
            AuditKind::DecryptAttempt,
            json!({ "key": physical_key, "label": label.to_string() }),
        );
        let aad = AssociatedData {
            label: label.clone(),
            record_id: physical_key.clone(),
            written_at,
        };
        let plaintext = self.crypto.decrypt(&label, &envelope, &aad)?;
        let body = match serde_json::from_slice::<Value>(&plaintext)? {
            Value::Object(map) => map,
            other => {
                return Err(CordonError::serialization(format!(
                    "Decrypted payload must be an object, got {other}"
                )))
            }
        };
        Ok(Some(OpenInstance {
            physical_key,
            label,
            body,
            written_at,
        }))
    }
}

impl std::fmt::Debug for ComposedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedStorage")
            .field("profile", &self.profile)
            .field("algorithm", &self.algorithm())
            .field("validation", &self.validator.is_some())
            .field("sync", &self.sync.is_some())
            .finish()
    }
}
