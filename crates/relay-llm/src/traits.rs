use crate::streaming::RunStreamEvent;
use crate::types::{AssistantInfo, Message, ThreadHandle, ThreadMessage};
use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use relay_types::ToolOutput;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub type RunEventStream = Pin<Box<dyn Stream<Item = Result<RunStreamEvent>> + Send>>;

/// Hosted assistant-run provider (threads, runs, messages)
///
/// Passed around as `Arc<dyn AssistantClient>` so tests can substitute a fake.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    /// Create an empty remote thread
    async fn create_thread(&self) -> Result<ThreadHandle>;

    /// Append a user message to a thread
    async fn create_message(&self, thread_id: &str, content: &str) -> Result<ThreadMessage>;

    /// Start a run on the thread and stream its events
    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream>;

    /// Resume a paused run with the outputs for every pending tool call
    async fn submit_tool_outputs_stream(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<RunEventStream>;

    /// All messages created after `after_message_id`, oldest first
    async fn list_messages_after(
        &self,
        thread_id: &str,
        after_message_id: &str,
    ) -> Result<Vec<ThreadMessage>>;

    /// Assistant definition, including the function tools it may call
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<AssistantInfo>;
}

/// Trait for one-shot chat completions
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub options: ChatOptions,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: ChatOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}
