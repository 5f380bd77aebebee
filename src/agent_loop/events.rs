//! Run event stream types.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapter::AdapterFamily;
use crate::capability::QualifiedName;
use crate::types::{CanonicalToolCall, CanonicalToolResult};

use super::continuation::ContinuationSignal;
use super::types::{RunId, Termination};

/// Callback receiving every event of a run, in order.
pub type RunEventSink = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Stream category for events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunEventStream {
    Lifecycle,
    Provider,
    Tool,
}

/// Concrete event payloads emitted by the orchestration loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventPayload {
    Started {
        provider: String,
        family: AdapterFamily,
        capabilities: usize,
    },
    StepStarted {
        step: u32,
    },
    ProviderResponded {
        step: u32,
        tool_calls: usize,
    },
    ToolCallStarted {
        call: CanonicalToolCall,
        qualified_name: QualifiedName,
    },
    ToolCallSkipped {
        call: CanonicalToolCall,
        reason: String,
    },
    ToolResult {
        result: CanonicalToolResult,
    },
    ContinuationSignal {
        signal: ContinuationSignal,
    },
    Finished {
        termination: Termination,
        steps: u32,
    },
    Failed {
        error: String,
    },
}

/// Envelope for run events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: RunId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub stream: RunEventStream,
    pub payload: RunEventPayload,
}

pub(crate) struct RunEventEmitter {
    run_id: RunId,
    seq: AtomicU64,
    sink: Option<RunEventSink>,
}

impl RunEventEmitter {
    pub(crate) fn new(run_id: RunId, sink: Option<RunEventSink>) -> Self {
        Self {
            run_id,
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(crate) fn emit(&self, stream: RunEventStream, payload: RunEventPayload) {
        let Some(sink) = &self.sink else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(RunEvent {
            run_id: self.run_id,
            seq,
            timestamp: Utc::now(),
            stream,
            payload,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[test]
    fn emitter_numbers_events_from_one() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let sink: RunEventSink = Arc::new(move |event: RunEvent| {
            sink_seen.lock().unwrap().push(event);
        });
        let run_id = Uuid::new_v4();
        let emitter = RunEventEmitter::new(run_id, Some(sink));
        emitter.emit(RunEventStream::Provider, RunEventPayload::StepStarted { step: 1 });
        emitter.emit(
            RunEventStream::Lifecycle,
            RunEventPayload::Finished {
                termination: Termination::Completed,
                steps: 1,
            },
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2]);
        assert!(seen.iter().all(|e| e.run_id == run_id));
    }

    #[test]
    fn payload_serializes_with_type_tag() {
        let payload = RunEventPayload::Finished {
            termination: Termination::BudgetExhausted,
            steps: 5,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "finished");
        assert_eq!(value["termination"], "budget_exhausted");
    }

    #[test]
    fn emitter_without_sink_is_silent() {
        let emitter = RunEventEmitter::new(Uuid::new_v4(), None);
        emitter.emit(RunEventStream::Tool, RunEventPayload::StepStarted { step: 1 });
        assert_eq!(emitter.seq.load(Ordering::SeqCst), 1);
    }
}
