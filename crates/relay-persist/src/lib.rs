pub mod dbs;
pub mod error;
pub mod memory;
pub mod trait_client;

pub use error::PersistError;
pub use memory::InMemoryMessageStore;
pub use trait_client::MessageStore;

#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoMessageStore;
