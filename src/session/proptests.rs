//! Property-based tests for normalization and merging

use super::*;
use proptest::prelude::*;
use serde_json::{json, Value};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("person".to_string()),
        Just("date-time".to_string()),
        Just("school".to_string()),
        Just("grade".to_string()),
        Just("celebrity".to_string()),
        Just("address".to_string()),
        Just("contact".to_string()),
        Just("number".to_string()),
        Just("yes-no".to_string()),
        "[a-z]{1,8}",
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(json!("")),
        "[가-힣a-z0-9 ]{1,12}".prop_map(Value::String),
        (0u32..10).prop_map(|n| json!(n)),
        "[가-힣]{1,4}".prop_map(|name| json!([{ "name": name }])),
        "[가-힣]{1,4}".prop_map(|name| json!({ "name": name })),
    ]
}

fn arb_params() -> impl Strategy<Value = Parameters> {
    proptest::collection::vec(
        (arb_key(), any::<bool>(), arb_value()),
        0..8,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(key, raw, value)| {
                let key = if raw {
                    format!("{key}{RAW_TRANSCRIPT_SUFFIX}")
                } else {
                    key
                };
                (key, value)
            })
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_normalized_has_no_raw_keys(raw in arb_params()) {
        let clean = normalize(&raw);
        prop_assert!(clean.keys().all(|k| !k.ends_with(RAW_TRANSCRIPT_SUFFIX)));
    }

    #[test]
    fn prop_normalize_is_idempotent(raw in arb_params()) {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn prop_bare_person_becomes_single_entity(name in "[가-힣a-zA-Z]{1,10}") {
        let mut raw = Parameters::new();
        raw.insert("person".to_string(), json!(name.clone()));
        let clean = normalize(&raw);
        prop_assert_eq!(&clean["person"], &json!([{ "name": name }]));
    }

    #[test]
    fn prop_merge_never_drops_unsupplied_fields(batches in proptest::collection::vec(arb_params(), 1..6)) {
        let store = SessionStore::new();
        store.get_or_create("s");

        for batch in batches {
            let before = store.get("s").unwrap().collected_fields;
            let clean = normalize(&batch);
            store.merge("s", clean.clone());
            let after = store.get("s").unwrap().collected_fields;

            for key in before.keys() {
                if !clean.contains_key(&key) {
                    prop_assert_eq!(before.get(&key), after.get(&key), "field {} changed", key);
                }
            }
            for key in clean.keys() {
                prop_assert!(after.contains(key), "field {} missing after merge", key);
            }
        }
    }

    #[test]
    fn prop_raw_keys_never_persist(batches in proptest::collection::vec(arb_params(), 1..4)) {
        let store = SessionStore::new();
        for batch in batches {
            store.merge("s", normalize(&batch));
        }
        if let Ok(record) = store.get("s") {
            prop_assert!(record
                .collected_fields
                .keys()
                .iter()
                .all(|k| !k.ends_with(RAW_TRANSCRIPT_SUFFIX)));
        }
    }
}
