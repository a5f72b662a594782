use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation record, keyed by the client-visible conversation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub visibility: Visibility,
    /// Remote thread adopted for this conversation, reused on later turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            visibility,
            thread_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Persisted chat message. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(chat_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(
        chat_id: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            role: Role::Assistant,
            content: content.into(),
            created_at,
        }
    }
}
