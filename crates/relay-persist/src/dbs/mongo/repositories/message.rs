use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    /// Save a batch of messages in one round trip
    pub async fn save_messages(&self, messages: Vec<MongoMessage>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        self.collection.insert_many(messages).await?;
        Ok(())
    }

    /// Get all messages for a chat
    pub async fn get_messages(&self, chat_id: &str) -> Result<Vec<MongoMessage>> {
        let filter = doc! { "chat_id": chat_id };
        let messages = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }
}
