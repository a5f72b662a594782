use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use relay_types::{Chat, Message, Role, Visibility};
use serde::{Deserialize, Serialize};

/// MongoDB document for a chat. The conversation id is the `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoChat {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// MongoDB document for a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<Chat> for MongoChat {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            owner_id: chat.owner_id,
            title: chat.title,
            visibility: chat.visibility,
            thread_id: chat.thread_id,
            created_at: chat.created_at,
        }
    }
}

impl From<MongoChat> for Chat {
    fn from(chat: MongoChat) -> Self {
        Self {
            id: chat.id,
            owner_id: chat.owner_id,
            title: chat.title,
            visibility: chat.visibility,
            thread_id: chat.thread_id,
            created_at: chat.created_at,
        }
    }
}

impl From<&Message> for MongoMessage {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id.clone(),
            chat_id: msg.chat_id.clone(),
            role: msg.role,
            content: msg.content.clone(),
            created_at: msg.created_at,
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(msg: MongoMessage) -> Self {
        Self {
            id: msg.id,
            chat_id: msg.chat_id,
            role: msg.role,
            content: msg.content,
            created_at: msg.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_document_uses_id_as_key() {
        let chat = Chat::new("c1", "u1", "Hello...", Visibility::Public).with_thread("thread_1");
        let doc = bson::to_document(&MongoChat::from(chat.clone())).unwrap();

        assert_eq!(doc.get_str("_id").unwrap(), "c1");
        assert_eq!(doc.get_str("visibility").unwrap(), "public");
        assert!(doc.get_datetime("created_at").is_ok());

        let back: MongoChat = bson::from_document(doc).unwrap();
        assert_eq!(Chat::from(back).thread_id.as_deref(), Some("thread_1"));
    }
}
