use std::sync::Arc;

use relay_llm::AssistantClient;
use relay_persist::{MessageStore, PersistError};
use relay_types::{Chat, Message, Visibility};
use thiserror::Error;
use tokio::time::Instant;

use crate::locks::KeyedLocks;
use crate::title::TitleGenerator;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Message content is required.")]
    EmptyMessage,

    #[error("Missing chatId for the conversation.")]
    MissingConversationId,

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("assistant provider error: {0}")]
    Remote(String),

    #[error("turn setup timed out")]
    Timeout,
}

impl SessionError {
    /// Caused by the request itself rather than a collaborator
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyMessage | Self::MissingConversationId)
    }
}

/// One user turn as received from the caller
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub chat_id: Option<String>,
    pub thread_id: Option<String>,
    pub message: String,
    pub owner_id: String,
    pub visibility: Option<Visibility>,
}

impl TurnRequest {
    pub fn new(owner_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// The chat id, else the thread id
    pub fn conversation_id(&self) -> Option<&str> {
        non_empty(self.chat_id.as_deref()).or_else(|| non_empty(self.thread_id.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// A turn whose chat, thread and user message are in place
#[derive(Debug, Clone)]
pub struct Turn {
    pub chat_id: String,
    pub thread_id: String,
    pub user_message: Message,
    /// Id of the user message on the remote thread; assistant output is
    /// everything after it
    pub remote_message_id: String,
    pub created_chat: bool,
    pub created_thread: bool,
    /// End of the request budget; set by `Relay::start_turn`
    pub deadline: Option<Instant>,
}

/// Maps conversation ids to chats and remote threads
pub struct SessionManager {
    store: Arc<dyn MessageStore>,
    client: Arc<dyn AssistantClient>,
    titles: Arc<dyn TitleGenerator>,
    locks: KeyedLocks,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn MessageStore>,
        client: Arc<dyn AssistantClient>,
        titles: Arc<dyn TitleGenerator>,
    ) -> Self {
        Self {
            store,
            client,
            titles,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn start_turn(&self, request: TurnRequest) -> Result<Turn, SessionError> {
        if request.message.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let chat_id = request
            .conversation_id()
            .ok_or(SessionError::MissingConversationId)?
            .to_string();

        let (thread_id, created_chat, created_thread) = {
            // chat + thread creation for one conversation happens at most once
            let _guard = self.locks.lock(&chat_id).await;

            let (chat, created_chat) = self.ensure_chat(&chat_id, &request).await?;
            let (thread_id, created_thread) = self.ensure_thread(&chat, &request).await?;
            (thread_id, created_chat, created_thread)
        };

        let user_message = Message::user(&chat_id, request.message.as_str());
        self.store.save_messages(std::slice::from_ref(&user_message)).await?;

        let remote = self
            .client
            .create_message(&thread_id, &request.message)
            .await
            .map_err(|e| SessionError::Remote(e.to_string()))?;

        tracing::info!(
            chat_id = %chat_id,
            thread_id = %thread_id,
            message_id = %remote.id,
            created_chat,
            created_thread,
            "Turn ready"
        );

        Ok(Turn {
            chat_id,
            thread_id,
            user_message,
            remote_message_id: remote.id,
            created_chat,
            created_thread,
            deadline: None,
        })
    }

    async fn ensure_chat(
        &self,
        chat_id: &str,
        request: &TurnRequest,
    ) -> Result<(Chat, bool), SessionError> {
        if let Some(chat) = self.store.get_chat_by_id(chat_id).await? {
            return Ok((chat, false));
        }

        let title = self.titles.generate(&request.message).await;
        let chat = Chat::new(
            chat_id,
            request.owner_id.as_str(),
            title,
            request.visibility.unwrap_or_default(),
        );

        match self.store.save_chat(chat.clone()).await {
            Ok(()) => {
                tracing::info!(chat_id = %chat_id, title = %chat.title, "Created chat");
                Ok((chat, true))
            }
            // created by another process sharing the store
            Err(PersistError::ChatAlreadyExists(_)) => {
                let existing = self
                    .store
                    .get_chat_by_id(chat_id)
                    .await?
                    .ok_or_else(|| PersistError::ChatNotFound(chat_id.to_string()))?;
                Ok((existing, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_thread(
        &self,
        chat: &Chat,
        request: &TurnRequest,
    ) -> Result<(String, bool), SessionError> {
        if let Some(supplied) = non_empty(request.thread_id.as_deref()) {
            if chat.thread_id.is_none() {
                self.store.set_chat_thread(&chat.id, supplied).await?;
            }
            return Ok((supplied.to_string(), false));
        }

        if let Some(existing) = &chat.thread_id {
            return Ok((existing.clone(), false));
        }

        let thread = self
            .client
            .create_thread()
            .await
            .map_err(|e| SessionError::Remote(e.to_string()))?;
        let recorded = self.store.set_chat_thread(&chat.id, &thread.id).await?;

        // another process sharing the store recorded its thread first
        if recorded != thread.id {
            tracing::warn!(
                chat_id = %chat.id,
                thread_id = %recorded,
                discarded_thread_id = %thread.id,
                "Adopted thread recorded by another relay"
            );
            return Ok((recorded, false));
        }

        tracing::info!(chat_id = %chat.id, thread_id = %thread.id, "Created remote thread for chat");
        Ok((thread.id, true))
    }
}
