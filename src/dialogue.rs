//! Scripted ethics-lesson conversation
//!
//! States are intents of the NLU agent. Each state has a pure handler; the
//! state graph decides whether a state waits for the learner or chains into
//! the next one within the same webhook turn.

mod effect;
pub mod graph;
pub mod handlers;
pub mod intent;
mod orchestrator;

#[cfg(test)]
mod proptests;

#[allow(unused_imports)] // Public API re-exports
pub use effect::{Effect, Reply};
#[allow(unused_imports)]
pub use graph::{GraphError, StateGraph, StateNode};
#[allow(unused_imports)]
pub use intent::{Intent, Topic};
#[allow(unused_imports)]
pub use orchestrator::{Orchestrator, Turn, TurnError, TurnOutcome, MAX_CHAIN_DEPTH};
