//! API request and response types

use crate::session::SessionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request to reset one session, or all when `session_id` is absent
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Every session record, keyed by id
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub count: usize,
    pub sessions: BTreeMap<String, SessionRecord>,
}

/// Which records a reset removed
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "scope")]
pub enum ResetResponse {
    /// A single session; `existed` is false if there was nothing to remove
    #[serde(rename_all = "camelCase")]
    One { session_id: String, existed: bool },
    All { removed: usize },
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
