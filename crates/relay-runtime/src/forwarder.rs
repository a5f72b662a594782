use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use relay_llm::AssistantClient;
use relay_persist::{MessageStore, PersistError};
use relay_types::{Message, RelayEvent};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::session::Turn;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to list thread messages: {0}")]
    Remote(String),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Pushes relay events to the caller and records the assistant's reply
///
/// Sending is best-effort: once the client hangs up, events are dropped but
/// the run keeps going so the reply still gets persisted.
pub struct ResponseForwarder {
    tx: mpsc::Sender<RelayEvent>,
    client: Arc<dyn AssistantClient>,
    store: Arc<dyn MessageStore>,
    disconnected: AtomicBool,
}

impl ResponseForwarder {
    pub fn new(
        tx: mpsc::Sender<RelayEvent>,
        client: Arc<dyn AssistantClient>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            tx,
            client,
            store,
            disconnected: AtomicBool::new(false),
        }
    }

    pub async fn emit(&self, event: RelayEvent) {
        if self.disconnected.load(Ordering::Relaxed) {
            return;
        }
        if self.tx.send(event).await.is_err() {
            tracing::info!("Client disconnected, continuing run without forwarding");
            self.disconnected.store(true, Ordering::Relaxed);
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Relaxed)
    }

    /// Store the assistant text produced after the turn's user message.
    ///
    /// One message per text segment, keeping the thread's timestamps. Returns
    /// how many messages were saved.
    pub async fn persist_completion(&self, turn: &Turn) -> Result<usize, ForwardError> {
        let thread_messages = self
            .client
            .list_messages_after(&turn.thread_id, &turn.remote_message_id)
            .await
            .map_err(|e| ForwardError::Remote(e.to_string()))?;

        let mut ordered: Vec<_> = thread_messages
            .into_iter()
            .filter(|m| m.is_assistant() && m.id != turn.remote_message_id)
            .collect();
        ordered.sort_by_key(|m| m.created_at);

        let batch: Vec<Message> = ordered
            .iter()
            .flat_map(|m| {
                let created_at = m.created_at_utc();
                m.text_segments()
                    .map(move |text| Message::assistant(&turn.chat_id, text, created_at))
            })
            .collect();

        if batch.is_empty() {
            tracing::debug!(chat_id = %turn.chat_id, "Run produced no assistant text");
            return Ok(0);
        }

        self.store.save_messages(&batch).await?;
        tracing::info!(chat_id = %turn.chat_id, count = batch.len(), "Persisted assistant messages");

        Ok(batch.len())
    }
}
