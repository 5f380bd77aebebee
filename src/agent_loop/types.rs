//! Core run types for the orchestration loop.

use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::adapter::ToolChoice;
use crate::artifacts::AccumulatedArtifacts;
use crate::types::Message;

/// Unique run identifier.
pub type RunId = Uuid;

/// Why a run stopped. Neither variant is an error.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Termination {
    /// The provider stopped asking for tools, or the continuation capability said stop.
    Completed,
    /// The step ceiling was reached; the result may be incomplete.
    BudgetExhausted,
}

/// Per-run options. Unset fields fall back to the orchestrator config.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct RunOptions {
    /// Provider id resolved through the provider registry.
    #[builder(into)]
    pub provider: String,
    /// Capability sources hidden from this run.
    #[builder(default)]
    #[serde(default)]
    pub excluded_sources: Vec<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    #[builder(into)]
    pub system_prompt: Option<String>,
    pub tool_choice: Option<ToolChoice>,
    pub max_steps: Option<u32>,
}

impl RunOptions {
    /// Options that only name the provider.
    pub fn for_provider(provider: impl Into<String>) -> Self {
        Self::builder().provider(provider).build()
    }
}

/// Result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    /// Final answer text; on early stops, the last non-empty text the provider produced.
    pub narrative_text: String,
    pub artifacts: AccumulatedArtifacts,
    pub termination: Termination,
    /// Provider turns taken.
    pub steps: u32,
    /// Working conversation at the end of the run.
    pub transcript: Vec<Message>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Completed
    }
}
