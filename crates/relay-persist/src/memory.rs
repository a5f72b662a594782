use std::collections::HashMap;

use async_trait::async_trait;
use relay_types::{Chat, Message};
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::trait_client::MessageStore;

/// Process-local store, used when no database is configured and in tests
#[derive(Default)]
pub struct InMemoryMessageStore {
    chats: RwLock<HashMap<String, Chat>>,
    messages: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn chat_count(&self) -> usize {
        self.chats.read().await.len()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Option<Chat>> {
        Ok(self.chats.read().await.get(chat_id).cloned())
    }

    async fn save_chat(&self, chat: Chat) -> Result<()> {
        let mut chats = self.chats.write().await;
        if chats.contains_key(&chat.id) {
            return Err(PersistError::ChatAlreadyExists(chat.id));
        }
        chats.insert(chat.id.clone(), chat);
        Ok(())
    }

    async fn set_chat_thread(&self, chat_id: &str, thread_id: &str) -> Result<String> {
        let mut chats = self.chats.write().await;
        let chat = chats
            .get_mut(chat_id)
            .ok_or_else(|| PersistError::ChatNotFound(chat_id.to_string()))?;
        Ok(chat
            .thread_id
            .get_or_insert_with(|| thread_id.to_string())
            .clone())
    }

    async fn save_messages(&self, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut store = self.messages.write().await;
        for message in messages {
            store
                .entry(message.chat_id.clone())
                .or_default()
                .push(message.clone());
        }
        Ok(())
    }

    async fn get_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let mut messages = self
            .messages
            .read()
            .await
            .get(chat_id)
            .cloned()
            .unwrap_or_default();
        // stable: insertion order breaks timestamp ties
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}
