//! Message types for agent turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use crate::Result;
use crate::error::Error;
use super::decoder::DecodedResponse;

/// Payload sent to the agent runtime for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    /// Carried in the URL path, not the body
    #[serde(skip)]
    pub session_id: String,
    pub input_text: String,
    pub enable_trace: bool,
    pub end_session: bool,
}

impl AgentRequest {
    pub fn new(session_id: impl Into<String>, input_text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            input_text: input_text.into(),
            enable_trace: true,
            end_session: false,
        }
    }

    pub fn with_trace(mut self, enable_trace: bool) -> Self {
        self.enable_trace = enable_trace;
        self
    }

    pub fn ending(mut self, end_session: bool) -> Self {
        self.end_session = end_session;
        self
    }

    /// JSON body: `{inputText, enableTrace, endSession}`
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Outcome of a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub status_code: u16,
    /// Final answer on success, error description on failure
    pub response_text: String,
    pub trace_log: String,
}

impl AgentReply {
    pub fn success(answer: impl Into<String>, trace_log: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            response_text: answer.into(),
            trace_log: trace_log.into(),
        }
    }

    pub fn failure(err: &Error) -> Self {
        Self {
            status_code: 500,
            response_text: err.to_string(),
            trace_log: String::new(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Shape the reply as `{status_code, body}` for an outer caller.
    pub fn to_collaborator(&self) -> CollaboratorReply {
        let body = if self.is_success() {
            json!({"response": self.response_text, "trace_data": self.trace_log})
        } else {
            json!({"error": self.response_text})
        };

        CollaboratorReply {
            status_code: self.status_code,
            body: body.to_string(),
        }
    }
}

/// Reply handed back across the collaborator boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorReply {
    pub status_code: u16,
    /// JSON string of `{response, trace_data}` or `{error}`
    pub body: String,
}

/// Turn request arriving from a front end
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub session_id: String,
    pub question: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub end_session: bool,
}

/// Accepts `true`, `"true"`, or absent/null.
fn flexible_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    Ok(match Option::<BoolOrString>::deserialize(deserializer)? {
        Some(BoolOrString::Bool(b)) => b,
        Some(BoolOrString::Str(s)) => s.trim().eq_ignore_ascii_case("true"),
        None => false,
    })
}

/// How an answer should be shown
#[derive(Debug, Clone, PartialEq)]
pub enum TurnAnswer {
    Text(String),
    Table(Vec<Map<String, Value>>),
}

impl TurnAnswer {
    /// Classify a decoded turn.
    ///
    /// The uncleaned answer is checked, since cleanup strips the quotes a
    /// JSON array needs. A non-empty array of objects becomes a table;
    /// anything else is the cleaned answer as text.
    pub fn from_decoded(decoded: &DecodedResponse) -> Self {
        match parse_table(&decoded.raw_answer) {
            Some(rows) => TurnAnswer::Table(rows),
            None => TurnAnswer::Text(decoded.answer.clone()),
        }
    }
}

fn parse_table(text: &str) -> Option<Vec<Map<String, Value>>> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text.trim()) else {
        return None;
    };
    let rows: Vec<Map<String, Value>> = items
        .iter()
        .filter_map(|item| item.as_object().cloned())
        .collect();
    (!rows.is_empty() && rows.len() == items.len()).then_some(rows)
}

/// One question/answer exchange in a chat session
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: TurnAnswer,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: TurnAnswer) -> Self {
        Self {
            question: question.into(),
            answer,
            timestamp: Utc::now(),
        }
    }
}
