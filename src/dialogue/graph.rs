//! The conversation's state graph and intent routing
//!
//! Each state names its handler and at most one successor: either a state to
//! chain into immediately (`next`) or the state the NLU agent is scripted to
//! match on the learner's next message (`expects`).

use super::handlers::{self, Handler};
use super::intent::{Intent, Topic};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

/// A state of the conversation
#[derive(Debug, Clone, Copy)]
pub struct StateNode {
    pub intent: Intent,
    pub handler: Handler,
    /// Run this state next, in the same turn, without new user input
    pub next: Option<Intent>,
    /// State the next user message is expected to match
    pub expects: Option<Intent>,
}

impl StateNode {
    /// A state that waits for the learner before moving on
    pub fn user_turn(intent: Intent, handler: Handler, expects: Intent) -> Self {
        Self {
            intent,
            handler,
            next: None,
            expects: Some(expects),
        }
    }

    /// A state that hands over to `next` within the same turn
    pub fn chaining(intent: Intent, handler: Handler, next: Intent) -> Self {
        Self {
            intent,
            handler,
            next: Some(next),
            expects: None,
        }
    }

    /// A state with no scripted successor
    pub fn terminal(intent: Intent, handler: Handler) -> Self {
        Self {
            intent,
            handler,
            next: None,
            expects: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("State {0} both chains and waits for input")]
    AmbiguousSuccessor(Intent),
    #[error("Chain starting at {0} never terminates")]
    ChainCycle(Intent),
    #[error("State {0} is not reachable from Welcome")]
    Unreachable(Intent),
    #[error("State {0} has no node")]
    MissingNode(Intent),
}

/// Map from state to its node; also the intent router
#[derive(Debug, Clone)]
pub struct StateGraph {
    nodes: BTreeMap<Intent, StateNode>,
    fallback: StateNode,
}

impl StateGraph {
    /// The scripted ethics lesson
    pub fn standard() -> Self {
        let mut nodes = vec![
            StateNode::user_turn(Intent::Welcome, handlers::welcome, Intent::IntroName),
            StateNode::user_turn(Intent::IntroName, handlers::intro_name, Intent::IntroBdate),
            StateNode::user_turn(Intent::IntroBdate, handlers::intro_bdate, Intent::IntroSchool),
            StateNode::chaining(Intent::IntroSchool, handlers::intro_school, Topic::Bias.intro()),
        ];

        let topic_handlers: [(Topic, [Handler; 3]); 4] = [
            (
                Topic::Bias,
                [handlers::bias_intro, handlers::bias_question, handlers::bias_answer],
            ),
            (
                Topic::Safety,
                [handlers::safety_intro, handlers::safety_question, handlers::safety_answer],
            ),
            (
                Topic::Responsibility,
                [
                    handlers::responsibility_intro,
                    handlers::responsibility_question,
                    handlers::responsibility_answer,
                ],
            ),
            (
                Topic::Transparency,
                [
                    handlers::transparency_intro,
                    handlers::transparency_question,
                    handlers::transparency_answer,
                ],
            ),
        ];
        for (topic, [intro, question, answer]) in topic_handlers {
            nodes.push(StateNode::user_turn(topic.intro(), intro, topic.question()));
            nodes.push(StateNode::user_turn(topic.question(), question, topic.answer()));
            nodes.push(StateNode::chaining(topic.answer(), answer, topic.next_segment()));
        }

        nodes.extend([
            StateNode::user_turn(Intent::PrivacyIntro, handlers::privacy_intro, Intent::PrivacyCelebrity),
            StateNode::user_turn(Intent::PrivacyCelebrity, handlers::privacy_celebrity, Intent::PrivacyAddress),
            StateNode::user_turn(Intent::PrivacyAddress, handlers::privacy_address, Intent::PrivacyContact),
            StateNode::chaining(Intent::PrivacyContact, handlers::privacy_contact, Intent::PrivacyReveal),
            StateNode::chaining(Intent::PrivacyReveal, handlers::privacy_reveal, Intent::Closing),
            StateNode::terminal(Intent::Closing, handlers::closing),
            StateNode::terminal(Intent::NoInput, handlers::no_input),
        ]);

        Self::from_nodes(nodes, StateNode::terminal(Intent::Fallback, handlers::fallback))
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = StateNode>, fallback: StateNode) -> Self {
        let mut nodes: BTreeMap<Intent, StateNode> =
            nodes.into_iter().map(|node| (node.intent, node)).collect();
        nodes.insert(fallback.intent, fallback);
        Self { nodes, fallback }
    }

    /// Route an intent display name to its state. Absent and unknown names
    /// get the fallback state.
    pub fn resolve(&self, name: Option<&str>) -> &StateNode {
        match name.and_then(Intent::from_name) {
            Some(intent) => self.node(intent),
            None => {
                tracing::warn!(intent = ?name, "Unknown intent, using fallback");
                &self.fallback
            }
        }
    }

    /// Node for a state; the fallback if the graph has no such node
    pub fn node(&self, intent: Intent) -> &StateNode {
        self.nodes.get(&intent).unwrap_or(&self.fallback)
    }

    /// States that run when `start` is entered, in order, following `next`
    /// links. Stops at the first repeated state.
    pub fn chain_from(&self, start: Intent) -> Vec<Intent> {
        let mut path = vec![start];
        let mut current = start;
        while let Some(next) = self.nodes.get(&current).and_then(|n| n.next) {
            if path.contains(&next) {
                break;
            }
            path.push(next);
            current = next;
        }
        path
    }

    /// Check the graph is well formed: every intent has a node, chains
    /// terminate and every scripted state is reachable.
    pub fn validate(&self) -> Result<(), GraphError> {
        for intent in Intent::ALL {
            if !self.nodes.contains_key(&intent) {
                return Err(GraphError::MissingNode(intent));
            }
        }

        for node in self.nodes.values() {
            if node.next.is_some() && node.expects.is_some() {
                return Err(GraphError::AmbiguousSuccessor(node.intent));
            }
        }

        for &start in self.nodes.keys() {
            let path = self.chain_from(start);
            let last = path.last().copied().unwrap_or(start);
            if self.nodes.get(&last).and_then(|n| n.next).is_some() {
                return Err(GraphError::ChainCycle(start));
            }
        }

        let reachable = self.reachable_from(Intent::Welcome);
        for &intent in self.nodes.keys() {
            if intent.is_scripted() && !reachable.contains(&intent) {
                return Err(GraphError::Unreachable(intent));
            }
        }

        Ok(())
    }

    fn reachable_from(&self, start: Intent) -> BTreeSet<Intent> {
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(intent) = queue.pop_front() {
            let Some(node) = self.nodes.get(&intent) else {
                continue;
            };
            for succ in node.next.into_iter().chain(node.expects) {
                if seen.insert(succ) {
                    queue.push_back(succ);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_graph_is_valid() {
        let graph = StateGraph::standard();
        assert_eq!(graph.validate(), Ok(()));
        for intent in Intent::ALL {
            assert_eq!(graph.node(intent).intent, intent);
        }
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let graph = StateGraph::standard();
        assert_eq!(graph.resolve(Some("Intro-name")).intent, Intent::IntroName);
        assert_eq!(graph.resolve(Some("Order-pizza")).intent, Intent::Fallback);
        assert_eq!(graph.resolve(None).intent, Intent::Fallback);
    }

    #[test]
    fn test_school_chains_into_bias() {
        let graph = StateGraph::standard();
        assert_eq!(
            graph.chain_from(Intent::IntroSchool),
            vec![Intent::IntroSchool, Intent::BiasIntro]
        );
    }

    #[test]
    fn test_topics_chain_in_order() {
        let graph = StateGraph::standard();
        for topic in Topic::ALL {
            let chain = graph.chain_from(topic.answer());
            assert_eq!(chain, vec![topic.answer(), topic.next_segment()]);
        }
    }

    #[test]
    fn test_topic_eventually_reaches_closing() {
        let graph = StateGraph::standard();
        for topic in Topic::ALL {
            // Follow next/expects links, ignoring the learner's answers
            let mut current = topic.intro();
            let mut steps = 0;
            while current != Intent::Closing {
                let node = graph.node(current);
                current = node.next.or(node.expects).expect("scripted state has a successor");
                steps += 1;
                assert!(steps < Intent::ALL.len(), "no path to closing from {topic:?}");
            }
        }
    }

    #[test]
    fn test_contact_chains_to_reveal_and_closing() {
        let graph = StateGraph::standard();
        assert_eq!(
            graph.chain_from(Intent::PrivacyContact),
            vec![Intent::PrivacyContact, Intent::PrivacyReveal, Intent::Closing]
        );
    }

    #[test]
    fn test_validate_detects_cycle() {
        let mut nodes: Vec<StateNode> = Intent::ALL
            .into_iter()
            .filter(|i| *i != Intent::Fallback)
            .map(|i| StateGraph::standard().node(i).to_owned())
            .collect();
        for node in &mut nodes {
            if node.intent == Intent::Closing {
                *node = StateNode::chaining(Intent::Closing, handlers::closing, Intent::PrivacyReveal);
            }
        }
        let graph = StateGraph::from_nodes(
            nodes,
            StateNode::terminal(Intent::Fallback, handlers::fallback),
        );
        assert!(matches!(graph.validate(), Err(GraphError::ChainCycle(_))));
    }

    #[test]
    fn test_validate_detects_missing_and_unreachable() {
        let fallback = StateNode::terminal(Intent::Fallback, handlers::fallback);
        let graph = StateGraph::from_nodes(
            [StateNode::terminal(Intent::Welcome, handlers::welcome)],
            fallback,
        );
        assert_eq!(graph.validate(), Err(GraphError::MissingNode(Intent::IntroName)));

        let nodes: Vec<StateNode> = Intent::ALL
            .into_iter()
            .filter(|i| *i != Intent::Fallback)
            .map(|i| match i {
                Intent::Welcome => StateNode::terminal(i, handlers::welcome),
                _ => *StateGraph::standard().node(i),
            })
            .collect();
        let graph = StateGraph::from_nodes(nodes, fallback);
        assert_eq!(graph.validate(), Err(GraphError::Unreachable(Intent::IntroName)));
    }

    #[test]
    fn test_validate_detects_ambiguous_successor() {
        let mut graph = StateGraph::standard();
        if let Some(node) = graph.nodes.get_mut(&Intent::Welcome) {
            node.next = Some(Intent::IntroName);
        }
        assert_eq!(
            graph.validate(),
            Err(GraphError::AmbiguousSuccessor(Intent::Welcome))
        );
    }
}
