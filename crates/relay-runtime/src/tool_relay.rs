use std::sync::Arc;

use futures::StreamExt;
use relay_llm::{AssistantClient, RunEventStream, RunStreamEvent};
use relay_types::{FailureReason, RelayEvent, RunPhase, ToolCall, ToolOutput};

use crate::forwarder::ResponseForwarder;
use crate::machine::RunMachine;
use crate::tools::ToolRegistry;

/// Run that reached `Completed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRun {
    pub run_id: String,
    pub tool_rounds: usize,
}

/// What ended one streaming segment of the run
enum SegmentEnd {
    Completed,
    Paused(Vec<ToolCall>),
    Failed,
}

/// Drives one assistant run to a terminal state, answering tool calls as
/// the run pauses for them
pub struct ToolRelay {
    client: Arc<dyn AssistantClient>,
    tools: Arc<ToolRegistry>,
    assistant_id: String,
    max_tool_rounds: usize,
}

impl ToolRelay {
    pub fn new(
        client: Arc<dyn AssistantClient>,
        tools: Arc<ToolRegistry>,
        assistant_id: impl Into<String>,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            client,
            tools,
            assistant_id: assistant_id.into(),
            max_tool_rounds,
        }
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    pub async fn drive(
        &self,
        thread_id: &str,
        forwarder: &ResponseForwarder,
    ) -> Result<CompletedRun, FailureReason> {
        let mut machine = RunMachine::new(self.max_tool_rounds);
        let mut run_id: Option<String> = None;

        tracing::info!(thread_id = %thread_id, assistant_id = %self.assistant_id, "Starting run");
        let mut stream = self
            .client
            .stream_run(thread_id, &self.assistant_id)
            .await
            .map_err(|e| FailureReason::Remote(e.to_string()))?;

        loop {
            match Self::forward_segment(&mut stream, &mut machine, &mut run_id, forwarder).await {
                SegmentEnd::Completed => {
                    let run_id = run_id.unwrap_or_default();
                    tracing::info!(
                        thread_id = %thread_id,
                        run_id = %run_id,
                        rounds = machine.rounds(),
                        "Run completed"
                    );
                    return Ok(CompletedRun {
                        run_id,
                        tool_rounds: machine.rounds(),
                    });
                }
                SegmentEnd::Failed => {
                    let reason = machine.into_failure();
                    tracing::warn!(thread_id = %thread_id, run_id = ?run_id, reason = %reason, "Run failed");
                    return Err(reason);
                }
                SegmentEnd::Paused(calls) => {
                    let Some(current_run) = run_id.clone() else {
                        machine.fail(FailureReason::ProtocolError(
                            "run paused before reporting its id".to_string(),
                        ));
                        return Err(machine.into_failure());
                    };

                    let outputs = self.resolve_tools(&calls, machine.rounds() + 1, forwarder).await;
                    machine.resume();

                    tracing::debug!(
                        run_id = %current_run,
                        round = machine.rounds(),
                        outputs = outputs.len(),
                        "Submitting tool outputs"
                    );
                    stream = match self
                        .client
                        .submit_tool_outputs_stream(thread_id, &current_run, outputs)
                        .await
                    {
                        Ok(stream) => stream,
                        Err(e) => {
                            machine.fail(FailureReason::Remote(e.to_string()));
                            return Err(machine.into_failure());
                        }
                    };
                }
            }
        }
    }

    /// Forward events until the run completes, fails or pauses
    async fn forward_segment(
        stream: &mut RunEventStream,
        machine: &mut RunMachine,
        run_id: &mut Option<String>,
        forwarder: &ResponseForwarder,
    ) -> SegmentEnd {
        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    machine.fail(FailureReason::Remote(e.to_string()));
                    return SegmentEnd::Failed;
                }
            };

            match event {
                RunStreamEvent::MessageDelta { message_id, text } => {
                    forwarder
                        .emit(RelayEvent::Text {
                            message_id,
                            content: text,
                        })
                        .await;
                }
                RunStreamEvent::MessageCompleted(message) => {
                    tracing::trace!(message_id = %message.id, "Assistant message completed");
                }
                RunStreamEvent::Error(message) => {
                    machine.fail(FailureReason::Remote(message));
                    return SegmentEnd::Failed;
                }
                RunStreamEvent::Done => break,
                RunStreamEvent::RunUpdated(run) => {
                    *run_id = Some(run.id.clone());

                    match machine.observe(&run.status(), run.error_detail()) {
                        RunPhase::Streaming => {}
                        RunPhase::Completed => return SegmentEnd::Completed,
                        RunPhase::Failed => return SegmentEnd::Failed,
                        RunPhase::AwaitingToolOutputs => match run.pending_tool_calls() {
                            Some(calls) if !calls.is_empty() => return SegmentEnd::Paused(calls),
                            _ => {
                                machine.fail(FailureReason::ProtocolError(
                                    "run requires action but lists no tool calls".to_string(),
                                ));
                                return SegmentEnd::Failed;
                            }
                        },
                    }
                }
            }
        }

        machine.fail(FailureReason::ProtocolError(
            "run stream ended before a terminal status".to_string(),
        ));
        SegmentEnd::Failed
    }

    async fn resolve_tools(
        &self,
        calls: &[ToolCall],
        round: usize,
        forwarder: &ResponseForwarder,
    ) -> Vec<ToolOutput> {
        tracing::info!(round, count = calls.len(), "Run paused for tool outputs");

        for call in calls {
            forwarder
                .emit(RelayEvent::ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                })
                .await;
        }

        let results = self.tools.dispatch(calls).await;

        let mut outputs = Vec::with_capacity(results.len());
        for result in results {
            forwarder
                .emit(RelayEvent::ToolResult {
                    tool_call_id: result.output.tool_call_id.clone(),
                    output: result.output.output.clone(),
                    is_error: result.is_error,
                })
                .await;
            outputs.push(result.output);
        }
        outputs
    }
}
