//! Shared test helpers: a scripted provider and canned capability hosts.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use tessera::agent_loop::{Orchestrator, RunEvent, RunEventSink};
use tessera::capability::{FnCapability, StaticCapabilityHost, ToolOutput};
use tessera::config::OrchestratorConfig;
use tessera::error::{Result, TesseraError};
use tessera::provider::{ProviderClient, ProviderQuery, ProviderRegistry};

/// Provider that replays queued raw responses and records every query.
pub struct ScriptedProvider {
    name: String,
    responses: Mutex<VecDeque<Value>>,
    queries: Mutex<Vec<ProviderQuery>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            responses: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, raw: Value) {
        self.responses.lock().unwrap().push_back(raw);
    }

    pub fn queries(&self) -> Vec<ProviderQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn query(&self, query: &ProviderQuery) -> Result<Value> {
        self.queries.lock().unwrap().push(query.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TesseraError::provider(&self.name, "no scripted response left"))
    }
}

/// `tool_use` response with optional leading text and `(id, name, input)` calls.
pub fn tool_use_response(text: &str, calls: &[(&str, &str, Value)]) -> Value {
    let mut content = Vec::new();
    if !text.is_empty() {
        content.push(json!({ "type": "text", "text": text }));
    }
    for (id, name, input) in calls {
        content.push(json!({ "type": "tool_use", "id": id, "name": name, "input": input }));
    }
    json!({ "content": content, "stop_reason": "tool_use" })
}

pub fn tool_use_text(text: &str) -> Value {
    json!({ "content": [{ "type": "text", "text": text }], "stop_reason": "end_turn" })
}

pub fn function_call_response(text: Option<&str>, calls: &[(&str, &str, Value)]) -> Value {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, input)| {
            json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": input.to_string() }
            })
        })
        .collect();
    json!({ "choices": [{ "message": { "role": "assistant", "content": text, "tool_calls": tool_calls } }] })
}

pub fn function_declaration_response(text: &str, calls: &[(&str, Value)]) -> Value {
    let mut parts = Vec::new();
    if !text.is_empty() {
        parts.push(json!({ "text": text }));
    }
    for (name, args) in calls {
        parts.push(json!({ "functionCall": { "name": name, "args": args } }));
    }
    json!({ "candidates": [{ "content": { "role": "model", "parts": parts } }] })
}

pub fn text_response(text: &str) -> Value {
    json!({ "response": text })
}

pub fn object_schema(required: &str) -> Value {
    json!({
        "type": "object",
        "properties": { required: { "type": "string", "description": "Entity to look up" } },
        "required": [required]
    })
}

/// `knowledge/lookup` returns text plus a one-node graph fragment and a reference.
pub fn knowledge_host() -> StaticCapabilityHost {
    StaticCapabilityHost::new()
        .with(
            "knowledge",
            FnCapability::new(
                "lookup",
                "Look up an entity in the knowledge base",
                object_schema("entity"),
                |input| async move {
                    let entity = input["entity"].as_str().unwrap_or("unknown").to_string();
                    Ok(ToolOutput::from_value(json!({
                        "content": [{ "type": "text", "text": format!("{entity} is a tumor suppressor gene") }],
                        "graph": {
                            "nodes": [{ "id": entity, "name": entity, "kind": "gene" }],
                            "links": []
                        },
                        "references": [{ "id": "pmid:7545954", "title": "BRCA1 discovery" }]
                    })))
                },
            ),
        )
        .with(
            "knowledge",
            FnCapability::new(
                "fail",
                "Always fails",
                json!({ "type": "object" }),
                |_input| async move {
                    Err(TesseraError::tool_execution("knowledge/fail", "backend unavailable"))
                },
            ),
        )
}

pub fn orchestrator(
    provider_id: &str,
    provider: Arc<ScriptedProvider>,
    host: StaticCapabilityHost,
    config: OrchestratorConfig,
) -> Orchestrator {
    let mut providers = ProviderRegistry::new();
    providers.register(provider_id, provider);
    Orchestrator::new(Arc::new(providers), Arc::new(host), config).expect("valid config")
}

/// Sink collecting events into a shared vector.
pub fn collecting_sink() -> (RunEventSink, Arc<Mutex<Vec<RunEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let sink: RunEventSink = Arc::new(move |event| sink_events.lock().unwrap().push(event));
    (sink, events)
}
