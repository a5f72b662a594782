pub mod types;
pub mod traits;
pub mod streaming;
pub mod buffer_utils;
pub mod openai;

pub use traits::{
    AssistantClient,
    ChatClient,
    ChatRequest, ChatResponse, ChatOptions,
    RunEventStream,
    TokenUsage,
};

pub use streaming::{RunStreamEvent, AssistantEventParser};
pub use buffer_utils::CircularLineBuffer;
pub use openai::OpenAIClient;
pub use types::{
    Message,
    AssistantInfo, MessageContent, RequiredAction, Run, ThreadHandle, ThreadMessage,
};
