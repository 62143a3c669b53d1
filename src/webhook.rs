//! Wire format of the NLU agent's fulfillment webhook
//!
//! Requests arrive in the agent's nested `queryResult` shape; a flat
//! `{intentName, sessionPath, parameters}` shape is accepted as well.
//! Replies carry the joined text plus one fulfillment message per
//! non-empty handler output.

use crate::dialogue::{Turn, TurnOutcome};
use crate::session::Parameters;
use serde::{Deserialize, Serialize};

/// Reply sent when a turn fails for any reason
pub const APOLOGY: &str = "죄송해요, 잠시 문제가 생겼어요. 조금 뒤에 다시 말해 줄래요?";

/// Separator between chained messages in `fulfillmentText`
const MESSAGE_SEPARATOR: &str = "\n\n";

// ============================================================
// Request
// ============================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub query_result: Option<QueryResult>,

    // Flat shape
    #[serde(default)]
    pub intent_name: Option<String>,
    #[serde(default)]
    pub session_path: Option<String>,
    #[serde(default)]
    pub parameters: Option<Parameters>,
    #[serde(default)]
    pub output_contexts: Vec<OutputContext>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub query_text: Option<String>,
    #[serde(default)]
    pub intent: Option<IntentRef>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub output_contexts: Vec<OutputContext>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Agent-side context. Only its name is read: the session store, not the
/// agent's contexts, is the source of collected facts.
#[derive(Debug, Default, Deserialize)]
pub struct OutputContext {
    #[serde(default)]
    pub name: String,
}

impl WebhookRequest {
    /// Names of the output contexts attached, in either shape
    pub fn context_names(&self) -> Vec<&str> {
        let nested = self
            .query_result
            .iter()
            .flat_map(|q| q.output_contexts.iter());
        self.output_contexts
            .iter()
            .chain(nested)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Raw utterance the intent was matched on, when the agent sends it
    pub fn query_text(&self) -> Option<&str> {
        self.query_result.as_ref()?.query_text.as_deref()
    }

    pub fn into_turn(self) -> Turn {
        let session_path = self.session.or(self.session_path);
        let session_id = session_id_from_path(session_path.as_deref());

        let (intent_name, parameters) = match self.query_result {
            Some(query) => (
                query.intent.and_then(|i| i.display_name).or(self.intent_name),
                if query.parameters.is_empty() {
                    self.parameters.unwrap_or_default()
                } else {
                    query.parameters
                },
            ),
            None => (self.intent_name, self.parameters.unwrap_or_default()),
        };

        Turn {
            session_id,
            intent_name,
            parameters,
        }
    }
}

/// Take the id out of `projects/<p>/agent/sessions/<id>[/...]`; without a
/// `sessions` segment the last path segment is the id. An empty id is
/// replaced by a fresh UUID.
pub fn session_id_from_path(path: Option<&str>) -> String {
    let id = path
        .map(|p| match p.rsplit_once("/sessions/") {
            Some((_, tail)) => tail.split('/').next().unwrap_or_default(),
            None => p.rsplit('/').next().unwrap_or_default(),
        })
        .map(str::trim)
        .unwrap_or_default();

    if id.is_empty() {
        let generated = uuid::Uuid::new_v4().to_string();
        tracing::debug!(session_id = %generated, "No session id in request, generated one");
        generated
    } else {
        id.to_string()
    }
}

// ============================================================
// Response
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
    pub fulfillment_messages: Vec<FulfillmentMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentMessage {
    pub text: MessageText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageText {
    pub text: Vec<String>,
}

impl FulfillmentMessage {
    fn new(text: &str) -> Self {
        Self {
            text: MessageText {
                text: vec![text.to_string()],
            },
        }
    }
}

impl WebhookResponse {
    /// Assemble the reply for a completed turn. Empty handler outputs are
    /// skipped; the rest keep chain order.
    pub fn build(outcome: &TurnOutcome) -> Self {
        let messages: Vec<&str> = outcome
            .messages
            .iter()
            .map(String::as_str)
            .filter(|m| !m.trim().is_empty())
            .collect();

        Self {
            fulfillment_text: messages.join(MESSAGE_SEPARATOR),
            fulfillment_messages: messages.into_iter().map(FulfillmentMessage::new).collect(),
        }
    }

    /// Fixed reply used when a turn fails
    pub fn apology() -> Self {
        Self {
            fulfillment_text: APOLOGY.to_string(),
            fulfillment_messages: vec![FulfillmentMessage::new(APOLOGY)],
        }
    }
}
