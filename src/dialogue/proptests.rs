//! Property-based tests for routing and chaining

use super::*;
use crate::session::{Parameters, SessionStore};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn orchestrator() -> Orchestrator {
    Orchestrator::new(Arc::new(SessionStore::new()), StateGraph::standard())
}

fn arb_intent() -> impl Strategy<Value = Intent> {
    proptest::sample::select(Intent::ALL.to_vec())
}

/// States whose handler cannot fail on arbitrary input
fn arb_infallible_intent() -> impl Strategy<Value = Intent> {
    arb_intent().prop_filter("birth date parsing can fail", |i| *i != Intent::IntroBdate)
}

fn arb_params() -> impl Strategy<Value = Parameters> {
    proptest::collection::btree_map(
        prop_oneof![
            Just("person".to_string()),
            Just("school".to_string()),
            Just("number".to_string()),
            Just("yes-no".to_string()),
            Just("celebrity".to_string()),
            "[a-z]{1,6}",
        ],
        prop_oneof![
            "[가-힣a-z0-9 ]{0,10}".prop_map(|s| json!(s)),
            (0i64..5).prop_map(|n| json!(n)),
        ],
        0..5,
    )
    .prop_map(|map| map.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_unknown_names_get_fallback(name in "[A-Za-z가-힣 -]{0,20}") {
        prop_assume!(Intent::from_name(&name).is_none());
        let orch = orchestrator();
        let outcome = orch.run_turn(&Turn {
            session_id: "s".to_string(),
            intent_name: Some(name),
            parameters: Parameters::new(),
        });
        prop_assert!(outcome.is_ok());
        prop_assert_eq!(outcome.unwrap().visited, vec![Intent::Fallback]);
    }

    #[test]
    fn prop_chains_terminate_within_depth(intent in arb_intent()) {
        let graph = StateGraph::standard();
        let chain = graph.chain_from(intent);
        prop_assert!(chain.len() <= MAX_CHAIN_DEPTH);
        let last = *chain.last().unwrap();
        prop_assert!(graph.node(last).next.is_none());
    }

    #[test]
    fn prop_turn_runs_exactly_the_chain(
        turns in proptest::collection::vec((arb_infallible_intent(), arb_params()), 1..10)
    ) {
        let graph = StateGraph::standard();
        let orch = orchestrator();

        for (intent, params) in turns {
            let outcome = orch.run_turn(&Turn {
                session_id: "s".to_string(),
                intent_name: Some(intent.name().to_string()),
                parameters: params,
            });
            prop_assert!(outcome.is_ok(), "{:?} failed: {:?}", intent, outcome);
            let outcome = outcome.unwrap();
            prop_assert_eq!(&outcome.visited, &graph.chain_from(intent));
            prop_assert_eq!(outcome.messages.len(), outcome.visited.len());
        }
    }

    #[test]
    fn prop_choice_never_changes_successor(choice in 0i64..6, topic_idx in 0usize..4) {
        let topic = Topic::ALL[topic_idx];
        let orch = orchestrator();
        let mut params = Parameters::new();
        params.insert("number".to_string(), json!(choice));
        params.insert("yes-no".to_string(), json!(if choice % 2 == 0 { "yes" } else { "no" }));

        let outcome = orch.run_turn(&Turn {
            session_id: "s".to_string(),
            intent_name: Some(topic.answer().name().to_string()),
            parameters: params,
        }).unwrap();
        prop_assert_eq!(outcome.visited, vec![topic.answer(), topic.next_segment()]);
    }
}
