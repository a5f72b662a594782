use async_trait::async_trait;
use relay_types::{Chat, Message};

use crate::error::Result;

/// Durable storage for chats and their messages
///
/// Implementations are shared as `Arc<dyn MessageStore>` between the session
/// manager (user side of a turn) and the forwarder (assistant side).
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Look up a chat by its conversation id
    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Option<Chat>>;

    /// Insert a new chat. Fails with `ChatAlreadyExists` if the id is taken.
    async fn save_chat(&self, chat: Chat) -> Result<()>;

    /// Record the remote thread adopted by a chat, unless one is already
    /// recorded. Returns the thread id the chat ends up with.
    async fn set_chat_thread(&self, chat_id: &str, thread_id: &str) -> Result<String>;

    /// Append a batch of messages. An empty batch is a no-op.
    async fn save_messages(&self, messages: &[Message]) -> Result<()>;

    /// All messages of a chat, oldest first
    async fn get_messages(&self, chat_id: &str) -> Result<Vec<Message>>;
}
