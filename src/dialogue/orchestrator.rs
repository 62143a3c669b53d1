//! Runs one webhook turn against the state graph
//!
//! Resolves the detected intent, runs its handler, applies the handler's
//! session effects and follows chain links until a state waits for the
//! learner.

use super::effect::Effect;
use super::graph::{StateGraph, StateNode};
use super::handlers::HandlerError;
use super::intent::Intent;
use crate::session::{normalize, Parameters, SessionStore};
use std::sync::Arc;
use thiserror::Error;

/// Upper bound on states run in a single turn
pub const MAX_CHAIN_DEPTH: usize = 16;

/// One intent-detection result, already stripped of wire details
#[derive(Debug, Clone, Default)]
pub struct Turn {
    pub session_id: String,
    pub intent_name: Option<String>,
    pub parameters: Parameters,
}

/// Result of a turn: the messages to show, in order
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub session_id: String,
    pub messages: Vec<String>,
    /// States executed, in order
    pub visited: Vec<Intent>,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Handler for {intent} failed: {source}")]
    Handler {
        intent: Intent,
        #[source]
        source: HandlerError,
    },
    #[error("Chain starting at {start} exceeded {} states", MAX_CHAIN_DEPTH)]
    ChainTooDeep { start: Intent },
}

pub struct Orchestrator {
    store: Arc<SessionStore>,
    graph: StateGraph,
}

impl Orchestrator {
    pub fn new(store: Arc<SessionStore>, graph: StateGraph) -> Self {
        Self { store, graph }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn run_turn(&self, turn: &Turn) -> Result<TurnOutcome, TurnError> {
        let session_id = turn.session_id.as_str();
        self.store.get_or_create(session_id);

        let params = normalize(&turn.parameters);
        self.store.merge(session_id, params.clone());

        let start = self.graph.resolve(turn.intent_name.as_deref());
        tracing::info!(
            session_id = %session_id,
            intent = %start.intent,
            "Handling turn"
        );

        let mut outcome = TurnOutcome {
            session_id: session_id.to_string(),
            messages: vec![],
            visited: vec![],
        };
        let mut node: &StateNode = start;
        // Chained states see no new slot values; they read the session.
        let mut turn_params = params;

        loop {
            if outcome.visited.len() >= MAX_CHAIN_DEPTH {
                return Err(TurnError::ChainTooDeep {
                    start: start.intent,
                });
            }

            let session = self.store.get_or_create(session_id);
            let reply = (node.handler)(&session, &turn_params).map_err(|source| {
                TurnError::Handler {
                    intent: node.intent,
                    source,
                }
            })?;

            for effect in reply.effects {
                self.apply(session_id, effect);
            }
            self.store.record_intent(session_id, node.intent.name());
            outcome.visited.push(node.intent);
            outcome.messages.push(reply.text);

            let Some(next) = node.next else {
                break;
            };
            tracing::debug!(
                session_id = %session_id,
                from = %node.intent,
                chain = %next,
                "Following chain"
            );
            node = self.graph.node(next);
            turn_params = Parameters::new();
        }

        self.store.record_turn(session_id);
        Ok(outcome)
    }

    fn apply(&self, session_id: &str, effect: Effect) {
        match effect {
            Effect::MergeFields(fields) => self.store.merge(session_id, normalize(&fields)),
            Effect::IncrementCounter(counter) => {
                let value = self.store.increment_counter(session_id, counter);
                tracing::debug!(session_id = %session_id, ?counter, value, "Counter incremented");
            }
        }
    }
}
