//! Polyinstantiation merge
//!
//! Merges the subject-readable instances of one logical entity into the
//! most classified view the reader is allowed to see, enriched with
//! whatever additional lower-classified detail also exists. Deterministic
//! and pure apart from the caller-supplied timestamp.

use cordon_core::SecurityLabel;
use serde_json::{Map, Value};

/// Key stamped onto every merged result
pub const FIELD_MERGED_AT: &str = "merged_at";

/// Merge readable instances into one view.
///
/// Instances sort by descending classification rank; the highest-ranked
/// instance supplies the base, and each lower-ranked instance fills in
/// only keys absent at every higher level examined so far, recursing
/// into nested objects. A key present at a higher level is never
/// overridden by a lower one. Returns the base label alongside the
/// merged body; `None` when no instances were supplied.
pub fn merge_instances(
    mut instances: Vec<(SecurityLabel, Map<String, Value>)>,
    merged_at: u64,
) -> Option<(SecurityLabel, Map<String, Value>)> {
    if instances.is_empty() {
        return None;
    }
    // At most one instance exists per level; the label display is a
    // deterministic tie-break in case a caller violates that.
    instances.sort_by(|(a, _), (b, _)| {
        b.level
            .rank()
            .cmp(&a.level.rank())
            .then_with(|| a.to_string().cmp(&b.to_string()))
    });

    let mut iter = instances.into_iter();
    let (base_label, mut merged) = iter.next()?;
    for (_, lower) in iter {
        fill_missing(&mut merged, &lower);
    }
    merged.insert(FIELD_MERGED_AT.to_string(), Value::Number(merged_at.into()));
    Some((base_label, merged))
}

/// Insert keys from `lower` that are absent in `base`; recurse where
/// both sides hold objects.
fn fill_missing(base: &mut Map<String, Value>, lower: &Map<String, Value>) {
    for (key, lower_value) in lower {
        match base.get_mut(key) {
            None => {
                base.insert(key.clone(), lower_value.clone());
            }
            Some(Value::Object(base_nested)) => {
                if let Value::Object(lower_nested) = lower_value {
                    fill_missing(base_nested, lower_nested);
                }
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cordon_core::ClassificationLevel;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    fn instance(level: ClassificationLevel, value: Value) -> (SecurityLabel, Map<String, Value>) {
        (SecurityLabel::uncompartmented(level), body(value))
    }

    #[test]
    fn higher_level_wins_on_conflicts_lower_fills_gaps() {
        let merged = merge_instances(
            vec![
                instance(ClassificationLevel::Secret, json!({"a": 1})),
                instance(ClassificationLevel::Confidential, json!({"a": 2, "b": 3})),
            ],
            1_700_000_000,
        )
        .unwrap();
        assert_eq!(merged.0.level, ClassificationLevel::Secret);
        assert_eq!(merged.1["a"], 1);
        assert_eq!(merged.1["b"], 3);
        assert_eq!(merged.1[FIELD_MERGED_AT], 1_700_000_000u64);
    }

    #[test]
    fn input_order_is_irrelevant() {
        let forward = merge_instances(
            vec![
                instance(ClassificationLevel::Confidential, json!({"a": 2, "b": 3})),
                instance(ClassificationLevel::Secret, json!({"a": 1})),
            ],
            0,
        )
        .unwrap();
        assert_eq!(forward.1["a"], 1);
        assert_eq!(forward.1["b"], 3);
    }

    #[test]
    fn merge_recurses_into_nested_objects() {
        let merged = merge_instances(
            vec![
                instance(
                    ClassificationLevel::Secret,
                    json!({"contact": {"callsign": "raven"}}),
                ),
                instance(
                    ClassificationLevel::Public,
                    json!({"contact": {"callsign": "open", "channel": 7}, "note": "x"}),
                ),
            ],
            0,
        )
        .unwrap();
        assert_eq!(merged.1["contact"]["callsign"], "raven");
        assert_eq!(merged.1["contact"]["channel"], 7);
        assert_eq!(merged.1["note"], "x");
    }

    #[test]
    fn middle_level_shadows_lower_not_higher() {
        let merged = merge_instances(
            vec![
                instance(ClassificationLevel::TopSecret, json!({"a": "ts"})),
                instance(ClassificationLevel::Secret, json!({"a": "s", "b": "s"})),
                instance(ClassificationLevel::Public, json!({"a": "p", "b": "p", "c": "p"})),
            ],
            0,
        )
        .unwrap();
        assert_eq!(merged.1["a"], "ts");
        assert_eq!(merged.1["b"], "s");
        assert_eq!(merged.1["c"], "p");
    }

    #[test]
    fn empty_input_merges_to_nothing() {
        assert!(merge_instances(vec![], 0).is_none());
    }

    #[test]
    fn single_instance_passes_through_with_stamp() {
        let merged = merge_instances(
            vec![instance(ClassificationLevel::Internal, json!({"a": 1}))],
            9,
        )
        .unwrap();
        assert_eq!(merged.1["a"], 1);
        assert_eq!(merged.1[FIELD_MERGED_AT], 9);
    }
}
