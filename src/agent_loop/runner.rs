//! The orchestration loop: gather from the provider, execute requested
//! capabilities, repeat until the provider stops or the step ceiling is hit.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapter::{PreparedCapability, ProviderAdapter};
use crate::artifacts::{ArtifactAccumulator, ReferenceKeyFn};
use crate::capability::{CapabilityDescriptor, CapabilityHost, QualifiedName, ToolOutput};
use crate::config::OrchestratorConfig;
use crate::error::{Result, TesseraError};
use crate::naming::CapabilityNameRegistry;
use crate::provider::{ProviderEntry, ProviderQuery, ProviderRegistry, QueryOptions};
use crate::schema::{translate, InputDescriptor};
use crate::types::{CanonicalToolCall, CanonicalToolResult, Message, Role};

use super::continuation::ContinuationSignal;
use super::events::{RunEventEmitter, RunEventPayload, RunEventSink, RunEventStream};
use super::state::{OrchestrationState, RunPhase};
use super::types::{RunId, RunOptions, RunOutcome, Termination};

/// Runs conversations against registered providers and capability hosts.
///
/// Holds only shared, read-only collaborators; every run builds its own
/// [`OrchestrationState`], so concurrent runs never observe each other.
#[derive(Clone)]
pub struct Orchestrator {
    providers: Arc<ProviderRegistry>,
    host: Arc<dyn CapabilityHost>,
    config: OrchestratorConfig,
    event_sink: Option<RunEventSink>,
    reference_key: Option<ReferenceKeyFn>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("providers", &self.providers)
            .field("config", &self.config)
            .field("event_sink", &self.event_sink.is_some())
            .finish()
    }
}

/// Everything a run resolves once before its first provider turn.
struct RunContext {
    provider_id: String,
    entry: ProviderEntry,
    names: CapabilityNameRegistry,
    inputs: HashMap<String, InputDescriptor>,
    system_prompt: Option<String>,
    query_options: QueryOptions,
    max_steps: u32,
    emitter: RunEventEmitter,
}

impl RunContext {
    fn adapter(&self) -> &dyn ProviderAdapter {
        self.entry.adapter.as_ref()
    }
}

impl Orchestrator {
    /// Fails with a configuration error when `config` does not validate.
    pub fn new(
        providers: Arc<ProviderRegistry>,
        host: Arc<dyn CapabilityHost>,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            providers,
            host,
            config,
            event_sink: None,
            reference_key: None,
        })
    }

    pub fn with_event_sink(mut self, sink: RunEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Override how reference entries are identified for deduplication.
    pub fn with_reference_key(mut self, key: ReferenceKeyFn) -> Self {
        self.reference_key = Some(key);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one conversation turn to completion.
    ///
    /// `history` is replayed ahead of `message`; system entries in it are
    /// folded into the system prompt. Errors are limited to configuration,
    /// provider resolution, capability listing and provider queries. Tool
    /// failures become error results in the transcript instead.
    pub async fn run(
        &self,
        message: &str,
        history: &[Message],
        options: &RunOptions,
    ) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let emitter = RunEventEmitter::new(run_id, self.event_sink.clone());
        match self.prepare(run_id, emitter, history, options).await {
            Ok(ctx) => {
                let outcome = self.drive(run_id, &ctx, message, history).await;
                if let Err(err) = &outcome {
                    self.fail(&ctx.emitter, run_id, err);
                }
                outcome
            }
            Err(err) => {
                let emitter = RunEventEmitter::new(run_id, self.event_sink.clone());
                self.fail(&emitter, run_id, &err);
                Err(err)
            }
        }
    }

    fn fail(&self, emitter: &RunEventEmitter, run_id: RunId, err: &TesseraError) {
        warn!(run_id = %run_id, error = %err, "run failed");
        emitter.emit(
            RunEventStream::Lifecycle,
            RunEventPayload::Failed {
                error: err.to_string(),
            },
        );
    }

    async fn prepare(
        &self,
        run_id: RunId,
        emitter: RunEventEmitter,
        history: &[Message],
        options: &RunOptions,
    ) -> Result<RunContext> {
        let max_steps = options.max_steps.unwrap_or(self.config.max_steps);
        if max_steps == 0 {
            return Err(TesseraError::InvalidArgument(
                "max_steps must be at least 1".into(),
            ));
        }

        let entry = self.providers.resolve(&options.provider)?;
        let family = entry.adapter.family();

        let descriptors = self.host.list_capabilities(&options.excluded_sources).await?;
        let mut names = CapabilityNameRegistry::with_limits(
            self.config.max_tool_name_len,
            self.config.source_prefix_budget,
        )?;
        let prepared = prepare_capabilities(&descriptors, &options.excluded_sources, &mut names);
        let inputs = prepared
            .iter()
            .map(|cap| (cap.normalized_name.clone(), cap.input.clone()))
            .collect();

        let tools = entry.adapter.convert_capabilities(&prepared);
        let base_prompt = compose_system_prompt(
            options
                .system_prompt
                .as_deref()
                .unwrap_or(&self.config.system_prompt),
            history,
        );
        let system_prompt = entry.adapter.system_prompt(base_prompt.as_deref(), &tools);

        let choice = options
            .tool_choice
            .as_ref()
            .unwrap_or(&self.config.tool_choice);
        let tool_choice = if tools.is_empty() {
            None
        } else {
            entry.adapter.tool_choice(choice)
        };
        let query_options = QueryOptions {
            temperature: options.temperature.or(self.config.temperature),
            max_tokens: Some(options.max_tokens.unwrap_or(self.config.max_tokens)),
            tools: tools.native_tools().to_vec(),
            tool_choice,
        };

        info!(
            run_id = %run_id,
            provider = %options.provider,
            family = %family,
            capabilities = tools.capability_count(),
            max_steps,
            "starting run"
        );
        emitter.emit(
            RunEventStream::Lifecycle,
            RunEventPayload::Started {
                provider: options.provider.clone(),
                family,
                capabilities: tools.capability_count(),
            },
        );

        Ok(RunContext {
            provider_id: options.provider.clone(),
            entry,
            names,
            inputs,
            system_prompt,
            query_options,
            max_steps,
            emitter,
        })
    }

    async fn drive(
        &self,
        run_id: RunId,
        ctx: &RunContext,
        message: &str,
        history: &[Message],
    ) -> Result<RunOutcome> {
        let mut working: Vec<Message> = history
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect();
        working.push(Message::user(message));
        let accumulator = match &self.reference_key {
            Some(key) => ArtifactAccumulator::with_reference_key(key.clone()),
            None => ArtifactAccumulator::new(),
        };
        let mut state = OrchestrationState::new(working, accumulator);

        let termination = loop {
            let phase = std::mem::replace(&mut state.phase, RunPhase::Gathering);
            state.phase = match phase {
                RunPhase::Gathering => self.gather(run_id, ctx, &mut state).await?,
                RunPhase::Executing(calls) => self.execute(run_id, ctx, &mut state, calls).await,
                RunPhase::Done(termination) => {
                    state.phase = RunPhase::Done(termination);
                    break termination;
                }
            };
        };

        info!(
            run_id = %run_id,
            termination = %termination,
            steps = state.step_count,
            "run finished"
        );
        ctx.emitter.emit(
            RunEventStream::Lifecycle,
            RunEventPayload::Finished {
                termination,
                steps: state.step_count,
            },
        );

        let narrative_text = state.narrative();
        Ok(RunOutcome {
            run_id,
            narrative_text,
            artifacts: state.accumulator.finish(),
            termination,
            steps: state.step_count,
            transcript: state.working_messages,
            finished_at: Utc::now(),
        })
    }

    /// One provider turn. Returns the next phase.
    async fn gather(
        &self,
        run_id: RunId,
        ctx: &RunContext,
        state: &mut OrchestrationState,
    ) -> Result<RunPhase> {
        state.step_count += 1;
        let step = state.step_count;
        ctx.emitter
            .emit(RunEventStream::Provider, RunEventPayload::StepStarted { step });

        let query = ProviderQuery {
            messages: ctx.adapter().render_messages(&state.working_messages),
            system_prompt: ctx.system_prompt.clone(),
            options: ctx.query_options.clone(),
        };
        let raw = bounded(
            ctx.entry.client.query(&query),
            self.config.provider_timeout_ms,
            |ms| TesseraError::provider(&ctx.provider_id, format!("no response after {ms} ms")),
        )
        .await?;
        let text = ctx.adapter().extract_text(&raw);
        let calls = ctx.adapter().extract_calls(&raw);
        state.record_text(&text);

        debug!(
            run_id = %run_id,
            provider = %ctx.provider_id,
            step,
            tool_calls = calls.len(),
            "provider responded"
        );
        ctx.emitter.emit(
            RunEventStream::Provider,
            RunEventPayload::ProviderResponded {
                step,
                tool_calls: calls.len(),
            },
        );

        if calls.is_empty() {
            if let Some(text) = state.turn_text.take() {
                state.push(Message::assistant(text));
            }
            return Ok(RunPhase::Done(Termination::Completed));
        }
        Ok(RunPhase::Executing(calls))
    }

    /// Execute one turn's calls in order. Returns the next phase.
    async fn execute(
        &self,
        run_id: RunId,
        ctx: &RunContext,
        state: &mut OrchestrationState,
        calls: Vec<CanonicalToolCall>,
    ) -> RunPhase {
        let mut signal = None;

        for call in calls {
            let qualified = match ctx.names.resolve(&call.normalized_name) {
                Ok(name) => name.clone(),
                Err(err) => {
                    warn!(
                        run_id = %run_id,
                        tool = %call.normalized_name,
                        "skipping call to unknown capability"
                    );
                    ctx.emitter.emit(
                        RunEventStream::Tool,
                        RunEventPayload::ToolCallSkipped {
                            call,
                            reason: err.to_string(),
                        },
                    );
                    continue;
                }
            };

            let lead = state.turn_text.take().unwrap_or_default();
            state.push(
                ctx.adapter()
                    .format_invocation(&lead, std::slice::from_ref(&call)),
            );
            ctx.emitter.emit(
                RunEventStream::Tool,
                RunEventPayload::ToolCallStarted {
                    call: call.clone(),
                    qualified_name: qualified.clone(),
                },
            );

            let (result, output) = self.invoke(run_id, ctx, &qualified, &call).await;
            state.accumulator.absorb(result.side_payloads.clone());
            state.push(ctx.adapter().format_results(std::slice::from_ref(&result)));

            if self.config.continuation_capability.as_ref() == Some(&qualified) {
                let parsed = output
                    .as_ref()
                    .map_or(ContinuationSignal::Done, |output| {
                        ContinuationSignal::from_content(&output.content)
                    });
                debug!(run_id = %run_id, signal = ?parsed, "continuation signal");
                ctx.emitter.emit(
                    RunEventStream::Tool,
                    RunEventPayload::ContinuationSignal {
                        signal: parsed.clone(),
                    },
                );
                signal = Some(parsed);
            }

            ctx.emitter
                .emit(RunEventStream::Tool, RunEventPayload::ToolResult { result });
        }

        if signal.is_some_and(|signal| !signal.should_continue()) {
            RunPhase::Done(Termination::Completed)
        } else if state.step_count >= ctx.max_steps {
            warn!(run_id = %run_id, steps = state.step_count, "step budget exhausted");
            RunPhase::Done(Termination::BudgetExhausted)
        } else {
            RunPhase::Gathering
        }
    }

    /// Execute a single call. Failures are folded into an error result.
    async fn invoke(
        &self,
        run_id: RunId,
        ctx: &RunContext,
        qualified: &QualifiedName,
        call: &CanonicalToolCall,
    ) -> (CanonicalToolResult, Option<ToolOutput>) {
        if self.config.validate_arguments {
            if let Some(input) = ctx.inputs.get(&call.normalized_name) {
                if let Err(reason) = input.validate(&call.input) {
                    warn!(run_id = %run_id, tool = %qualified, %reason, "invalid tool arguments");
                    let result = CanonicalToolResult::failure(
                        &call.correlation_id,
                        &call.normalized_name,
                        format!("Invalid arguments: {reason}"),
                    );
                    return (result, None);
                }
            }
        }

        let execution = self
            .host
            .call_tool(&qualified.source, &qualified.capability, call.input.clone());
        let outcome = bounded(execution, self.config.tool_timeout_ms, |ms| {
            TesseraError::tool_execution(qualified.to_string(), format!("timed out after {ms} ms"))
        })
        .await;
        match outcome {
            Ok(output) => {
                debug!(run_id = %run_id, tool = %qualified, "tool call succeeded");
                let result = CanonicalToolResult::success(
                    &call.correlation_id,
                    &call.normalized_name,
                    output.content_text(),
                )
                .with_side_payloads(output.side_payloads.clone());
                (result, Some(output))
            }
            Err(err) => {
                warn!(run_id = %run_id, tool = %qualified, error = %err, "tool call failed");
                let result = CanonicalToolResult::failure(
                    &call.correlation_id,
                    &call.normalized_name,
                    format!("Error: {err}"),
                );
                (result, None)
            }
        }
    }
}

/// Await `fut`, giving up after `limit_ms` when a limit is set.
async fn bounded<T, F>(
    fut: F,
    limit_ms: Option<u64>,
    on_timeout: impl FnOnce(u64) -> TesseraError,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(ms) = limit_ms else {
        return fut.await;
    };
    match time::timeout(Duration::from_millis(ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(ms)),
    }
}

/// Translate and name every listed capability. Collisions and sources the
/// host failed to exclude are dropped with a warning.
fn prepare_capabilities(
    descriptors: &[CapabilityDescriptor],
    excluded_sources: &[String],
    names: &mut CapabilityNameRegistry,
) -> Vec<PreparedCapability> {
    let mut seen = HashSet::new();
    let mut prepared = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if excluded_sources.contains(&descriptor.name.source) {
            warn!(capability = %descriptor.name, "host listed an excluded source, dropping");
            continue;
        }
        let normalized = match names.normalize(&descriptor.name) {
            Ok(normalized) => normalized,
            Err(err) => {
                warn!(capability = %descriptor.name, error = %err, "omitting capability");
                continue;
            }
        };
        if !seen.insert(normalized.clone()) {
            continue;
        }
        prepared.push(PreparedCapability::new(
            normalized,
            descriptor.description.clone(),
            translate(&descriptor.parameter_schema),
        ));
    }
    prepared
}

fn compose_system_prompt(base: &str, history: &[Message]) -> Option<String> {
    let mut sections: Vec<String> = Vec::new();
    if !base.trim().is_empty() {
        sections.push(base.to_string());
    }
    sections.extend(
        history
            .iter()
            .filter(|m| m.role == Role::System)
            .map(Message::text)
            .filter(|text| !text.trim().is_empty()),
    );
    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_history_is_folded_into_prompt() {
        let history = vec![
            Message::system("Prefer peer-reviewed sources."),
            Message::user("hi"),
        ];
        assert_eq!(
            compose_system_prompt("Base prompt.", &history).as_deref(),
            Some("Base prompt.\n\nPrefer peer-reviewed sources.")
        );
        assert_eq!(compose_system_prompt("", &[]), None);
    }

    #[test]
    fn colliding_capabilities_are_omitted() {
        let descriptors = vec![
            CapabilityDescriptor::new("kb", "lookup", "first", json!({"type": "object"})),
            CapabilityDescriptor::new("kb", "lookup", "duplicate listing", json!({})),
            CapabilityDescriptor::new("kb", "x-y", "lands on kb_x_y", json!({})),
            CapabilityDescriptor::new("kb-x", "y", "also lands on kb_x_y", json!({})),
            CapabilityDescriptor::new("hidden", "probe", "excluded", json!({})),
        ];
        let mut names = CapabilityNameRegistry::new();
        let prepared = prepare_capabilities(&descriptors, &["hidden".to_string()], &mut names);
        let described: Vec<&str> = prepared.iter().map(|c| c.description.as_str()).collect();
        assert_eq!(described, vec!["first", "lands on kb_x_y"]);
        assert_eq!(
            names.resolve("kb_x_y").unwrap(),
            &QualifiedName::new("kb", "x-y")
        );
        assert_eq!(
            names.resolve(&prepared[0].normalized_name).unwrap(),
            &QualifiedName::new("kb", "lookup")
        );
    }
}
