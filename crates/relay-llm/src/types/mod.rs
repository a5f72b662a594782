pub mod assistant;
pub mod message;

pub use assistant::{
    AssistantInfo, AssistantTool, FunctionCall, FunctionName, MessageContent, MessageList,
    RequiredAction, Run, RunError, SubmitToolOutputs, TextValue, ThreadHandle, ThreadMessage,
    WireToolCall,
};
pub use message::Message;
