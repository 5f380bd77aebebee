//! Convenience re-exports for common use.

pub use crate::adapter::{AdapterFamily, ProviderAdapter, ToolChoice};
pub use crate::agent_loop::{
    Orchestrator, RunEvent, RunEventPayload, RunEventSink, RunOptions, RunOutcome, Termination,
};
pub use crate::artifacts::{AccumulatedArtifacts, KnowledgeGraph, ReferenceEntry, SidePayloads};
pub use crate::capability::{CapabilityDescriptor, CapabilityHost, QualifiedName, ToolOutput};
pub use crate::config::OrchestratorConfig;
pub use crate::error::{Result, TesseraError};
pub use crate::provider::{ProviderClient, ProviderQuery, ProviderRegistry};
pub use crate::types::{CanonicalToolCall, CanonicalToolResult, ContentPart, Message, Role};
