//! Orchestration loop: runs, run state, continuation signals and events.

pub mod continuation;
pub mod events;
pub mod runner;
pub mod state;
pub mod types;

pub use continuation::ContinuationSignal;
pub use events::{RunEvent, RunEventPayload, RunEventSink, RunEventStream};
pub use runner::Orchestrator;
pub use state::{OrchestrationState, RunPhase};
pub use types::{RunId, RunOptions, RunOutcome, Termination};
