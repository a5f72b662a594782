pub mod builder;
pub mod forwarder;
pub mod locks;
pub mod machine;
pub mod relay;
pub mod session;
pub mod title;
pub mod tool_relay;
pub mod tools;

pub use builder::RelayBuilder;
pub use forwarder::{ForwardError, ResponseForwarder};
pub use machine::RunMachine;
pub use relay::Relay;
pub use session::{SessionError, SessionManager, Turn, TurnRequest};
pub use title::{LlmTitleGenerator, TitleGenerator, TruncatingTitleGenerator};
pub use tool_relay::{CompletedRun, ToolRelay};
pub use tools::{
    CurrentTimeTool, ToolError, ToolHandler, ToolRegistry, ToolRegistryBuilder, ToolRegistryError,
    ToolResult,
};

// Re-export key types from relay-types
pub use relay_types::{
    Chat, FailureReason, Message, RelayConfig, RelayEvent, Role, RunPhase, ToolCall, ToolOutput,
    Visibility,
};
