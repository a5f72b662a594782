use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Tool invocation requested by a paused run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON text exactly as emitted by the run
    pub arguments: String,
}

/// Result submitted back to the run for one tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

impl ToolOutput {
    pub fn new(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            output: output.into(),
        }
    }
}

/// Status string reported by the remote provider for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    Unknown(String),
}

impl RunStatus {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            "expired" => Self::Expired,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown(s) => s,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local view of a run's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    Streaming,
    AwaitingToolOutputs,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Why a turn failed
///
/// `Display` is what the client sees; details carried by `Remote` and
/// `Persist` are for server logs only.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// Transport or API error talking to the provider
    Remote(String),
    /// The completed reply could not be stored
    Persist(String),
    /// Run reached a non-success terminal status
    RunEnded {
        status: RunStatus,
        detail: Option<String>,
    },
    ToolLoopExceeded { max_rounds: usize },
    Timeout { after: Duration },
    /// Stream or status the relay cannot interpret
    ProtocolError(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(_) => f.write_str("assistant provider error"),
            Self::Persist(_) => f.write_str("failed to save the reply"),
            Self::RunEnded { status, detail: Some(detail) } => {
                write!(f, "run ended with status {}: {}", status, detail)
            }
            Self::RunEnded { status, detail: None } => {
                write!(f, "run ended with status {}", status)
            }
            Self::ToolLoopExceeded { max_rounds } => {
                write!(f, "tool loop exceeded ({} rounds)", max_rounds)
            }
            Self::Timeout { after } => write!(f, "request timed out after {:?}", after),
            Self::ProtocolError(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}
