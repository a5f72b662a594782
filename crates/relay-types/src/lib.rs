pub mod chat;
pub mod config;
pub mod events;
pub mod run;

pub use chat::{Chat, Message, Role, Visibility};
pub use config::RelayConfig;
pub use events::RelayEvent;
pub use run::{FailureReason, RunPhase, RunStatus, ToolCall, ToolOutput};
