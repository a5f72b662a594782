//! Wire types for the hosted assistant-run API (threads, runs, messages)

use chrono::{DateTime, Utc};
use relay_types::{RunStatus, ToolCall};
use serde::{Deserialize, Serialize};

/// Opaque remote thread handle. The id is a capability token, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadHandle {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
    #[serde(default)]
    pub incomplete_details: Option<serde_json::Value>,
}

impl Run {
    pub fn status(&self) -> RunStatus {
        RunStatus::from_wire(&self.status)
    }

    /// Tool calls the run is waiting on, if paused for tool outputs
    pub fn pending_tool_calls(&self) -> Option<Vec<ToolCall>> {
        match &self.required_action {
            Some(RequiredAction::SubmitToolOutputs { submit_tool_outputs }) => Some(
                submit_tool_outputs
                    .tool_calls
                    .iter()
                    .map(WireToolCall::to_tool_call)
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<String> {
        if let Some(err) = &self.last_error {
            return Some(format!("{}: {}", err.code, err.message));
        }
        self.incomplete_details.as_ref().map(|d| d.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    SubmitToolOutputs { submit_tool_outputs: SubmitToolOutputs },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,
    pub function: FunctionCall,
}

fn default_tool_type() -> String {
    "function".to_string()
}

impl WireToolCall {
    pub fn to_tool_call(&self) -> ToolCall {
        ToolCall {
            id: self.id.clone(),
            name: self.function.name.clone(),
            arguments: self.function.arguments.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    /// Unix seconds
    pub created_at: i64,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default)]
    pub run_id: Option<String>,
}

impl ThreadMessage {
    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }

    /// Text-typed content segments, in order
    pub fn text_segments(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|c| match c {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        })
    }

    pub fn created_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.created_at, 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageList {
    pub data: Vec<ThreadMessage>,
    #[serde(default)]
    pub last_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tools: Vec<AssistantTool>,
}

impl AssistantInfo {
    /// Names of the function tools the assistant may request
    pub fn function_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .filter_map(|t| match t {
                AssistantTool::Function { function } => Some(function.name.clone()),
                AssistantTool::Other => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantTool {
    Function { function: FunctionName },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionName {
    pub name: String,
}
