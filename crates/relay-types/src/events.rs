use serde::{Deserialize, Serialize};

/// Event forwarded to the calling client while a turn is relayed
///
/// The first event of every turn is `Control`; the stream then carries
/// run output in emission order and ends with exactly one `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// Correlates the stream with the remote thread and the sent user message;
    /// fields go out as `threadId` / `messageId`
    #[serde(rename_all = "camelCase")]
    Control {
        thread_id: String,
        message_id: String,
    },

    /// Assistant text (streamed token-by-token)
    Text {
        message_id: String,
        content: String,
    },

    /// Run paused to request a tool
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },

    /// Local tool finished (or failed) and its output was collected
    ToolResult {
        tool_call_id: String,
        output: String,
        is_error: bool,
    },

    /// Run completed
    Done {
        run_id: String,
        persisted: usize,
    },

    /// Run failed; nothing is persisted for this turn
    Error {
        message: String,
    },
}

impl RelayEvent {
    /// Name used for the SSE `event:` field
    pub fn name(&self) -> &'static str {
        match self {
            Self::Control { .. } => "control",
            Self::Text { .. } => "message",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
