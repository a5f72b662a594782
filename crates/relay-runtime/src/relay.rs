use std::sync::Arc;

use anyhow::Result;
use relay_llm::AssistantClient;
use relay_persist::MessageStore;
use relay_types::{FailureReason, RelayConfig, RelayEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::builder::RelayBuilder;
use crate::forwarder::{ForwardError, ResponseForwarder};
use crate::session::{SessionError, SessionManager, Turn, TurnRequest};
use crate::tool_relay::ToolRelay;
use crate::tools::ToolRegistry;

/// Entry point for relaying user turns to a hosted assistant
pub struct Relay {
    client: Arc<dyn AssistantClient>,
    store: Arc<dyn MessageStore>,
    tools: Arc<ToolRegistry>,
    session: SessionManager,
    tool_relay: Arc<ToolRelay>,
    config: RelayConfig,
}

impl Relay {
    pub(crate) fn from_parts(
        client: Arc<dyn AssistantClient>,
        store: Arc<dyn MessageStore>,
        tools: Arc<ToolRegistry>,
        session: SessionManager,
        tool_relay: ToolRelay,
        config: RelayConfig,
    ) -> Self {
        Self {
            client,
            store,
            tools,
            session,
            tool_relay: Arc::new(tool_relay),
            config,
        }
    }

    pub fn builder() -> RelayBuilder {
        RelayBuilder::new()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Function tools declared on the assistant that have no local handler
    pub async fn lint_tools(&self) -> Result<Vec<String>> {
        let assistant = self
            .client
            .retrieve_assistant(self.tool_relay.assistant_id())
            .await?;
        let missing = self.tools.lint(&assistant.function_names());

        for name in &missing {
            tracing::warn!(
                tool = %name,
                assistant_id = %assistant.id,
                "Assistant declares a tool with no local handler; calls will get an error output"
            );
        }
        Ok(missing)
    }

    /// Ensure chat, thread and user message for a turn.
    ///
    /// Starts the request budget; the returned turn carries its deadline so
    /// `spawn_turn` only gets what setup left over.
    pub async fn start_turn(&self, request: TurnRequest) -> Result<Turn, SessionError> {
        let deadline = Instant::now() + self.config.request_timeout;
        let mut turn = tokio::time::timeout_at(deadline, self.session.start_turn(request))
            .await
            .map_err(|_| SessionError::Timeout)??;
        turn.deadline = Some(deadline);
        Ok(turn)
    }

    /// Relay the run for a prepared turn in a background task.
    ///
    /// The receiver yields `Control` first and ends after one `Done` or
    /// `Error`. Dropping it does not stop the run.
    pub fn spawn_turn(&self, turn: Turn) -> mpsc::Receiver<RelayEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_buffer);

        let forwarder = ResponseForwarder::new(tx, Arc::clone(&self.client), Arc::clone(&self.store));
        let tool_relay = Arc::clone(&self.tool_relay);
        let timeout = self.config.request_timeout;
        let deadline = turn.deadline.unwrap_or_else(|| Instant::now() + timeout);

        tokio::spawn(async move {
            forwarder
                .emit(RelayEvent::Control {
                    thread_id: turn.thread_id.clone(),
                    message_id: turn.remote_message_id.clone(),
                })
                .await;

            let outcome = tokio::time::timeout_at(deadline, async {
                let completed = tool_relay.drive(&turn.thread_id, &forwarder).await?;
                let persisted = forwarder.persist_completion(&turn).await.map_err(|e| {
                    tracing::error!(chat_id = %turn.chat_id, error = %e, "Failed to persist assistant messages");
                    match e {
                        ForwardError::Remote(detail) => FailureReason::Remote(detail),
                        ForwardError::Persist(err) => FailureReason::Persist(err.to_string()),
                    }
                })?;
                Ok::<_, FailureReason>((completed, persisted))
            })
            .await
            .unwrap_or_else(|_| Err(FailureReason::Timeout { after: timeout }));

            match outcome {
                Ok((completed, persisted)) => {
                    forwarder
                        .emit(RelayEvent::Done {
                            run_id: completed.run_id,
                            persisted,
                        })
                        .await;
                }
                Err(reason) => {
                    tracing::warn!(
                        chat_id = %turn.chat_id,
                        thread_id = %turn.thread_id,
                        reason = ?reason,
                        "Turn failed"
                    );
                    forwarder
                        .emit(RelayEvent::Error {
                            message: reason.to_string(),
                        })
                        .await;
                }
            }
        });

        rx
    }
}
