use async_trait::async_trait;
use mongodb::Client;
use relay_types::{Chat, Message};

use crate::dbs::mongo::models::{MongoChat, MongoMessage};
use crate::dbs::mongo::repositories::{MongoChatRepository, MongoMessageRepository};
use crate::error::{PersistError, Result};
use crate::trait_client::MessageStore;

pub struct MongoMessageStore {
    chat_repo: MongoChatRepository,
    message_repo: MongoMessageRepository,
}

impl MongoMessageStore {
    /// Connect to MongoDB and create the store
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        tracing::info!(database = %database, "Connected to MongoDB");

        Ok(Self {
            chat_repo: MongoChatRepository::new(&client, database),
            message_repo: MongoMessageRepository::new(&client, database),
        })
    }
}

#[async_trait]
impl MessageStore for MongoMessageStore {
    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Option<Chat>> {
        Ok(self.chat_repo.get_chat(chat_id).await?.map(Chat::from))
    }

    async fn save_chat(&self, chat: Chat) -> Result<()> {
        self.chat_repo.insert_chat(MongoChat::from(chat)).await
    }

    async fn set_chat_thread(&self, chat_id: &str, thread_id: &str) -> Result<String> {
        self.chat_repo.set_thread(chat_id, thread_id).await
    }

    async fn save_messages(&self, messages: &[Message]) -> Result<()> {
        let docs = messages.iter().map(MongoMessage::from).collect();
        self.message_repo.save_messages(docs).await
    }

    async fn get_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let messages = self.message_repo.get_messages(chat_id).await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }
}
