//! Polyinstantiation behavior of the composed storage: one physical
//! instance per `(logical_id, level)`, dominance-gated visibility, and
//! the deterministic classified-view merge.

use cordon_core::{ClassificationLevel, Effects, Record, RecordShape, SecurityLabel};
use cordon_store::{
    AuthContext, ComposedStorage, LoaderSinks, MemoryAdapter, StorageLoader, StorageOptions,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

fn body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test body must be an object"),
    }
}

fn poly(id: &str, level: ClassificationLevel, value: Value) -> Record {
    Record::poly_instance(id, SecurityLabel::uncompartmented(level), body(value))
}

/// Storage loaded for a secret-cleared principal with no timing floor
/// (timing behavior has its own test file).
fn harness() -> (ComposedStorage, Arc<MemoryAdapter>, Effects) {
    let effects = Effects::test();
    let adapter = Arc::new(MemoryAdapter::new());
    let loader = StorageLoader::new(effects.clone());
    let storage = loader
        .load(
            &AuthContext::new("secret", vec![]),
            StorageOptions {
                timing_floor_ms: 0,
                ..StorageOptions::default()
            },
            adapter.clone() as Arc<dyn cordon_store::PersistenceAdapter>,
            LoaderSinks::default(),
        )
        .unwrap();
    (storage, adapter, effects)
}

fn login(storage: &ComposedStorage, level: &str) {
    storage
        .context()
        .set_context("carol", level, Vec::<&str>::new(), Duration::from_secs(3600))
        .unwrap();
}

#[tokio::test]
async fn same_level_write_overwrites_in_place() {
    let (storage, adapter, _) = harness();
    login(&storage, "secret");

    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"a": 1})))
        .await
        .unwrap();
    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"a": 2})))
        .await
        .unwrap();

    use cordon_store::PersistenceAdapter;
    assert_eq!(adapter.get_all("docs").await.unwrap().len(), 1);
    let view = storage.get("docs", "x", RecordShape::PolyInstance).await.unwrap();
    assert_eq!(view.body["a"], 2);
}

#[tokio::test]
async fn different_level_write_creates_a_sibling() {
    let (storage, adapter, _) = harness();

    login(&storage, "confidential");
    storage
        .put("docs", poly("x", ClassificationLevel::Confidential, json!({"a": 2})))
        .await
        .unwrap();
    login(&storage, "secret");
    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"a": 1})))
        .await
        .unwrap();

    use cordon_store::PersistenceAdapter;
    let rows = adapter.get_all("docs").await.unwrap();
    assert_eq!(rows.len(), 2);
    let keys: Vec<&str> = rows
        .iter()
        .filter_map(|row| row.get("id").and_then(Value::as_str))
        .collect();
    assert!(keys.contains(&"x-secret"));
    assert!(keys.contains(&"x-confidential"));
}

#[tokio::test]
async fn merge_prefers_higher_level_and_fills_gaps() {
    let (storage, _, _) = harness();

    login(&storage, "confidential");
    storage
        .put(
            "docs",
            poly("x", ClassificationLevel::Confidential, json!({"a": 2, "b": 3})),
        )
        .await
        .unwrap();
    login(&storage, "secret");
    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"a": 1})))
        .await
        .unwrap();

    let view = storage.get("docs", "x", RecordShape::PolyInstance).await.unwrap();
    assert_eq!(view.label.level, ClassificationLevel::Secret);
    assert_eq!(view.body["a"], 1);
    assert_eq!(view.body["b"], 3);
    assert!(view.merged_at.is_some());
    assert!(view.body.contains_key("merged_at"));
}

#[tokio::test]
async fn lower_cleared_reader_sees_only_their_instance() {
    let (storage, _, _) = harness();

    login(&storage, "confidential");
    storage
        .put(
            "docs",
            poly("x", ClassificationLevel::Confidential, json!({"a": 2, "b": 3})),
        )
        .await
        .unwrap();
    login(&storage, "secret");
    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"a": 1})))
        .await
        .unwrap();

    login(&storage, "confidential");
    let view = storage.get("docs", "x", RecordShape::PolyInstance).await.unwrap();
    assert_eq!(view.label.level, ClassificationLevel::Confidential);
    assert_eq!(view.body["a"], 2);
    assert_eq!(view.body["b"], 3);
}

#[tokio::test]
async fn unreadable_logical_entity_is_not_found() {
    let (storage, _, _) = harness();
    login(&storage, "secret");
    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"a": 1})))
        .await
        .unwrap();

    login(&storage, "public");
    let result = storage.get("docs", "x", RecordShape::PolyInstance).await;
    assert!(matches!(
        result,
        Err(cordon_core::CordonError::NotFound { .. })
    ));
}

#[tokio::test]
async fn history_is_newest_first_and_readable_only() {
    let (storage, _, effects) = harness();

    login(&storage, "public");
    storage
        .put("docs", poly("x", ClassificationLevel::Public, json!({"note": "open"})))
        .await
        .unwrap();
    effects.time.advance(10).unwrap();
    login(&storage, "secret");
    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"callsign": "raven"})))
        .await
        .unwrap();

    let history = storage.get_history("docs", "x").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].label.level, ClassificationLevel::Secret);
    assert_eq!(history[1].label.level, ClassificationLevel::Public);
    assert!(history[0].written_at > history[1].written_at);
    // Instances are unmerged
    assert!(!history[0].body.contains_key("note"));

    login(&storage, "public");
    let history = storage.get_history("docs", "x").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].label.level, ClassificationLevel::Public);
}

#[tokio::test]
async fn delete_is_rejected_rather_than_partially_applied() {
    let (storage, adapter, _) = harness();

    login(&storage, "confidential");
    storage
        .put("docs", poly("x", ClassificationLevel::Confidential, json!({"a": 2})))
        .await
        .unwrap();
    login(&storage, "secret");
    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"a": 1})))
        .await
        .unwrap();

    // The secret subject can read both instances but the confidential
    // one does not dominate it, so the whole deletion is rejected.
    let result = storage.delete("docs", "x", RecordShape::PolyInstance).await;
    assert!(matches!(
        result,
        Err(cordon_core::CordonError::MacDenyDelete { .. })
    ));
    use cordon_store::PersistenceAdapter;
    assert_eq!(adapter.get_all("docs").await.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_removes_exactly_the_dominated_instances() {
    let (storage, adapter, _) = harness();

    login(&storage, "confidential");
    storage
        .put("docs", poly("x", ClassificationLevel::Confidential, json!({"a": 2})))
        .await
        .unwrap();
    login(&storage, "secret");
    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"a": 1})))
        .await
        .unwrap();

    // A confidential subject sees only the confidential instance and may
    // delete it; the secret sibling survives untouched.
    login(&storage, "confidential");
    let deleted = storage
        .delete("docs", "x", RecordShape::PolyInstance)
        .await
        .unwrap();
    assert_eq!(deleted, vec!["x-confidential".to_string()]);

    use cordon_store::PersistenceAdapter;
    let remaining = adapter.get_all("docs").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        remaining[0].get("id").and_then(Value::as_str),
        Some("x-secret")
    );
}

#[tokio::test]
async fn get_all_filters_and_decrypts_per_row() {
    let (storage, _, _) = harness();

    login(&storage, "secret");
    storage
        .put("docs", poly("x", ClassificationLevel::Secret, json!({"a": 1})))
        .await
        .unwrap();
    login(&storage, "public");
    storage
        .put("docs", poly("y", ClassificationLevel::Public, json!({"b": 2})))
        .await
        .unwrap();

    // Public subject: only the public row comes back, already decrypted.
    let views = storage.get_all("docs").await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, "y");
    assert_eq!(views[0].body["b"], 2);

    login(&storage, "secret");
    let views = storage.get_all("docs").await.unwrap();
    assert_eq!(views.len(), 2);
}
