//! Denial opacity: a denied read, a genuinely absent record, and a slow
//! decryption must be indistinguishable by wall-clock latency. Runs
//! under the paused tokio clock so the floor is measured exactly.

use cordon_core::{ClassificationLevel, Effects, Record, RecordShape, SecurityLabel};
use cordon_store::{
    AuthContext, ComposedStorage, LoaderSinks, MemoryAdapter, StorageLoader, StorageOptions,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const FLOOR: Duration = Duration::from_millis(100);

fn body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test body must be an object"),
    }
}

fn harness() -> ComposedStorage {
    let effects = Effects::test();
    let loader = StorageLoader::new(effects);
    loader
        .load(
            &AuthContext::new("secret", vec![]),
            StorageOptions::default(),
            Arc::new(MemoryAdapter::new()),
            LoaderSinks::default(),
        )
        .unwrap()
}

fn login(storage: &ComposedStorage, level: &str) {
    storage
        .context()
        .set_context("carol", level, Vec::<&str>::new(), Duration::from_secs(3600))
        .unwrap();
}

async fn seed_secret_doc(storage: &ComposedStorage) {
    login(storage, "secret");
    storage
        .put(
            "docs",
            Record::normal(
                "doc-1",
                SecurityLabel::uncompartmented(ClassificationLevel::Secret),
                body(json!({"title": "briefing"})),
            ),
        )
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn denied_and_absent_reads_share_one_latency_profile() {
    let storage = harness();
    seed_secret_doc(&storage).await;
    login(&storage, "public");

    let started = Instant::now();
    let denied = storage.get("docs", "doc-1", RecordShape::Normal).await;
    let denied_elapsed = started.elapsed();

    let started = Instant::now();
    let absent = storage.get("docs", "doc-404", RecordShape::Normal).await;
    let absent_elapsed = started.elapsed();

    // Both surface as not-found
    assert!(matches!(denied, Err(cordon_core::CordonError::NotFound { .. })));
    assert!(matches!(absent, Err(cordon_core::CordonError::NotFound { .. })));

    // Both take at least the floor, and the same amount of it
    assert!(denied_elapsed >= FLOOR);
    assert!(absent_elapsed >= FLOOR);
    let difference = if denied_elapsed > absent_elapsed {
        denied_elapsed - absent_elapsed
    } else {
        absent_elapsed - denied_elapsed
    };
    assert!(difference < Duration::from_millis(5), "difference {difference:?}");
}

#[tokio::test(start_paused = true)]
async fn successful_reads_are_padded_to_the_same_floor() {
    let storage = harness();
    seed_secret_doc(&storage).await;

    let started = Instant::now();
    let view = storage
        .get("docs", "doc-1", RecordShape::Normal)
        .await
        .unwrap();
    let elapsed = started.elapsed();
    assert_eq!(view.body["title"], "briefing");
    assert!(elapsed >= FLOOR);
}

#[tokio::test(start_paused = true)]
async fn denied_writes_are_padded_and_still_fail() {
    let storage = harness();
    login(&storage, "secret");

    let started = Instant::now();
    let result = storage
        .put(
            "docs",
            Record::normal(
                "doc-low",
                SecurityLabel::uncompartmented(ClassificationLevel::Public),
                body(json!({"note": "write-down"})),
            ),
        )
        .await;
    let elapsed = started.elapsed();

    assert!(matches!(
        result,
        Err(cordon_core::CordonError::MacDenyWrite { .. })
    ));
    assert!(elapsed >= FLOOR);
}

#[tokio::test(start_paused = true)]
async fn deletes_run_inside_the_shield_too() {
    let storage = harness();
    seed_secret_doc(&storage).await;

    let started = Instant::now();
    storage
        .delete("docs", "doc-1", RecordShape::Normal)
        .await
        .unwrap();
    assert!(started.elapsed() >= FLOOR);
}
