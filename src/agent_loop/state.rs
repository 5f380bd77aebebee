//! Per-run mutable state. Created fresh for each run and never shared.

use crate::artifacts::ArtifactAccumulator;
use crate::types::{CanonicalToolCall, Message};

use super::types::Termination;

/// Where the loop is.
#[derive(Debug, Clone, PartialEq)]
pub enum RunPhase {
    /// Ask the provider for the next turn.
    Gathering,
    /// Execute the calls the provider just requested.
    Executing(Vec<CanonicalToolCall>),
    Done(Termination),
}

#[derive(Debug)]
pub struct OrchestrationState {
    pub working_messages: Vec<Message>,
    pub accumulator: ArtifactAccumulator,
    pub step_count: u32,
    pub phase: RunPhase,
    /// Last non-empty text the provider produced.
    pub last_text: Option<String>,
    /// Text of the current turn, attached to its first invocation record.
    pub(crate) turn_text: Option<String>,
}

impl OrchestrationState {
    pub fn new(working_messages: Vec<Message>, accumulator: ArtifactAccumulator) -> Self {
        Self {
            working_messages,
            accumulator,
            step_count: 0,
            phase: RunPhase::Gathering,
            last_text: None,
            turn_text: None,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.working_messages.push(message);
    }

    /// Record a provider turn's text.
    pub fn record_text(&mut self, text: &str) {
        if text.trim().is_empty() {
            self.turn_text = None;
        } else {
            self.last_text = Some(text.to_string());
            self.turn_text = Some(text.to_string());
        }
    }

    pub fn narrative(&self) -> String {
        self.last_text.clone().unwrap_or_default()
    }
}
