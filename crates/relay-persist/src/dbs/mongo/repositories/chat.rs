use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{bson::doc, Client, Collection};

use crate::dbs::mongo::models::MongoChat;
use crate::error::{PersistError, Result};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoChatRepository {
    collection: Collection<MongoChat>,
}

impl MongoChatRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("chats");
        Self { collection }
    }

    /// Get chat by conversation id
    pub async fn get_chat(&self, chat_id: &str) -> Result<Option<MongoChat>> {
        let filter = doc! { "_id": chat_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// Insert a chat; the `_id` index turns a second insert into `ChatAlreadyExists`
    pub async fn insert_chat(&self, chat: MongoChat) -> Result<()> {
        match self.collection.insert_one(&chat).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(PersistError::ChatAlreadyExists(chat.id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Set the chat's thread only while none is recorded; returns the recorded one
    pub async fn set_thread(&self, chat_id: &str, thread_id: &str) -> Result<String> {
        // `null` also matches a missing field
        let filter = doc! { "_id": chat_id, "thread_id": null };
        let update = doc! { "$set": { "thread_id": thread_id } };

        let result = self.collection.update_one(filter, update).await?;
        if result.matched_count == 1 {
            return Ok(thread_id.to_string());
        }

        let chat = self
            .get_chat(chat_id)
            .await?
            .ok_or_else(|| PersistError::ChatNotFound(chat_id.to_string()))?;
        chat.thread_id.ok_or_else(|| {
            PersistError::Internal(format!("chat {} has no thread after conditional update", chat_id))
        })
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}
