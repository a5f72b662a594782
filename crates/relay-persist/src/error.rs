use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON serialization error: {0}")]
    BsonSerialization(#[from] bson::ser::Error),

    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    #[error("Chat already exists: {0}")]
    ChatAlreadyExists(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;
