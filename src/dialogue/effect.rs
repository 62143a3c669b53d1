//! Handler output and the effects it requests

use crate::session::{Counter, Parameters};

/// Session mutations a handler asks the orchestrator to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Merge parameters the handler derived (normalized before merging)
    MergeFields(Parameters),

    /// Bump a per-session counter
    IncrementCounter(Counter),
}

/// What a handler produced for one state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub text: String,
    pub effects: Vec<Effect>,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            effects: vec![],
        }
    }

    /// A reply with no text of its own; used by states that only chain
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}
