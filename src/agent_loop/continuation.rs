//! Continuation signal read from a designated capability's result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::format::value_to_text;

const CONTINUE_KEYS: [&str; 3] = ["nextThoughtNeeded", "next_thought_needed", "continue"];
const THOUGHT_KEYS: [&str; 2] = ["thought", "nextThought"];

/// Whether the model asked for another think/act turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "thought", rename_all = "snake_case")]
pub enum ContinuationSignal {
    ContinueWithThought(String),
    Done,
}

impl ContinuationSignal {
    /// Parse a continuation capability's primary content.
    ///
    /// Anything that does not carry an explicit `true` flag is `Done`, so a
    /// malformed result can never keep a run looping.
    pub fn from_content(content: &Value) -> Self {
        let Some(document) = as_document(content) else {
            return Self::Done;
        };
        let flag = CONTINUE_KEYS
            .iter()
            .find_map(|key| document.get(*key))
            .and_then(as_flag);
        if flag != Some(true) {
            return Self::Done;
        }
        let thought = THOUGHT_KEYS
            .iter()
            .find_map(|key| document.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        Self::ContinueWithThought(thought)
    }

    pub fn should_continue(&self) -> bool {
        matches!(self, Self::ContinueWithThought(_))
    }
}

fn as_document(content: &Value) -> Option<Value> {
    match content {
        Value::Object(_) => Some(content.clone()),
        Value::String(_) | Value::Array(_) => {
            let text = value_to_text(content);
            serde_json::from_str::<Value>(text.trim())
                .ok()
                .filter(Value::is_object)
        }
        _ => None,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
