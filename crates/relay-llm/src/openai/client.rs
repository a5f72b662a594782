// OpenAI-specific client implementation

use crate::streaming::parse_run_sse_stream;
use crate::traits::{
    AssistantClient, ChatClient, ChatRequest, ChatResponse, RunEventStream, TokenUsage,
};
use crate::types::{AssistantInfo, MessageList, ThreadHandle, ThreadMessage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use relay_types::ToolOutput;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const ASSISTANTS_BETA: &str = "assistants=v2";
const LIST_PAGE_SIZE: u32 = 100;

/// OpenAI client (HTTP direct, no SDK)
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAIClient {
    /// Create new client with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );
        headers.insert(
            HeaderName::from_static("openai-beta"),
            HeaderValue::from_static(ASSISTANTS_BETA),
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: OPENAI_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Response> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;

        Self::ensure_success(response).await
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }
        Ok(response)
    }

    fn build_chat_request(&self, request: &ChatRequest) -> Result<Value> {
        let mut payload = serde_json::json!({
            "model": request.model,
            "messages": serde_json::to_value(&request.messages)?,
        });

        if let Some(obj) = payload.as_object_mut() {
            if let Some(temp) = request.options.temperature {
                obj.insert("temperature".to_string(), serde_json::json!(temp));
            }
            if let Some(max_tokens) = request.options.max_tokens {
                obj.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
            }
        }

        Ok(payload)
    }
}

// ============================================================================
// TRAIT IMPLEMENTATIONS
// ============================================================================

#[async_trait]
impl AssistantClient for OpenAIClient {
    async fn create_thread(&self) -> Result<ThreadHandle> {
        let response = self.post_json("/threads", &serde_json::json!({})).await?;
        let thread: ThreadHandle = response
            .json()
            .await
            .context("Failed to parse thread")?;

        tracing::debug!(thread_id = %thread.id, "Created remote thread");
        Ok(thread)
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<ThreadMessage> {
        let payload = serde_json::json!({
            "role": "user",
            "content": content,
        });
        let response = self
            .post_json(&format!("/threads/{}/messages", thread_id), &payload)
            .await?;

        response.json().await.context("Failed to parse message")
    }

    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream> {
        let payload = serde_json::json!({
            "assistant_id": assistant_id,
            "stream": true,
        });
        let response = self
            .post_json(&format!("/threads/{}/runs", thread_id), &payload)
            .await?;

        Ok(parse_run_sse_stream(response))
    }

    async fn submit_tool_outputs_stream(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<RunEventStream> {
        let payload = serde_json::json!({
            "tool_outputs": outputs,
            "stream": true,
        });
        let response = self
            .post_json(
                &format!("/threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
                &payload,
            )
            .await?;

        Ok(parse_run_sse_stream(response))
    }

    async fn list_messages_after(
        &self,
        thread_id: &str,
        after_message_id: &str,
    ) -> Result<Vec<ThreadMessage>> {
        let mut messages = Vec::new();
        let mut cursor = after_message_id.to_string();

        loop {
            let limit = LIST_PAGE_SIZE.to_string();
            let response = self
                .http_client
                .get(self.url(&format!("/threads/{}/messages", thread_id)))
                .query(&[("order", "asc"), ("after", cursor.as_str()), ("limit", limit.as_str())])
                .send()
                .await
                .context("Failed to send request")?;
            let page: MessageList = Self::ensure_success(response)
                .await?
                .json()
                .await
                .context("Failed to parse message list")?;

            let has_more = page.has_more;
            let last_id = page.last_id.clone().or_else(|| page.data.last().map(|m| m.id.clone()));
            messages.extend(page.data);

            match last_id {
                Some(id) if has_more => cursor = id,
                _ => break,
            }
        }

        Ok(messages)
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<AssistantInfo> {
        let response = self
            .http_client
            .get(self.url(&format!("/assistants/{}", assistant_id)))
            .send()
            .await
            .context("Failed to send request")?;

        Self::ensure_success(response)
            .await?
            .json()
            .await
            .context("Failed to parse assistant")
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_chat_request(&request)?;
        let response = self.post_json("/chat/completions", &payload).await?;

        let raw: OpenAIChatResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        let choice = raw.choices.into_iter().next();
        Ok(ChatResponse {
            content: choice.as_ref().and_then(|c| c.message.content.clone()),
            usage: raw.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.and_then(|c| c.finish_reason),
        })
    }
}

// ============================================================================
// OPENAI-SPECIFIC RESPONSE TYPES (for Chat Completions)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
