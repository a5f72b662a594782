use anyhow::{Context, Result};
use futures::Stream;
use reqwest::Response;
use serde::Deserialize;
use std::pin::Pin;

use crate::buffer_utils::{parse_sse_stream, SseLineParser};
use crate::types::{Run, ThreadMessage};

/// Event emitted while an assistant run streams
#[derive(Debug, Clone)]
pub enum RunStreamEvent {
    /// Any `thread.run.*` event; carries the run snapshot with its status
    RunUpdated(Run),

    /// Incremental assistant text
    MessageDelta {
        message_id: String,
        text: String,
    },

    /// An assistant message was finalized on the thread
    MessageCompleted(ThreadMessage),

    /// Provider-reported stream error
    Error(String),

    /// End of stream marker
    Done,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaChunk {
    id: String,
    delta: MessageDeltaBody,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaBody {
    #[serde(default)]
    content: Vec<DeltaContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DeltaContent {
    Text {
        #[serde(default)]
        text: Option<DeltaText>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct DeltaText {
    #[serde(default)]
    value: Option<String>,
}

/// Parses the assistant-run event vocabulary
pub struct AssistantEventParser;

impl AssistantEventParser {
    fn error_message(data: &str) -> String {
        let value: serde_json::Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(_) => return data.to_string(),
        };
        value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string())
    }
}

impl SseLineParser for AssistantEventParser {
    type Event = RunStreamEvent;

    fn parse_event(&self, event: Option<&str>, data: &str) -> Result<Vec<RunStreamEvent>> {
        let Some(event) = event else {
            return Ok(Vec::new());
        };

        match event {
            "error" => Ok(vec![RunStreamEvent::Error(Self::error_message(data))]),
            "done" => Ok(vec![RunStreamEvent::Done]),
            "thread.message.delta" => {
                let chunk: MessageDeltaChunk = serde_json::from_str(data)
                    .context("Failed to parse message delta")?;
                let message_id = chunk.id;
                Ok(chunk
                    .delta
                    .content
                    .into_iter()
                    .filter_map(|part| match part {
                        DeltaContent::Text { text: Some(DeltaText { value: Some(value) }) }
                            if !value.is_empty() =>
                        {
                            Some(RunStreamEvent::MessageDelta {
                                message_id: message_id.clone(),
                                text: value,
                            })
                        }
                        _ => None,
                    })
                    .collect())
            }
            "thread.message.completed" => {
                let message: ThreadMessage = serde_json::from_str(data)
                    .context("Failed to parse completed message")?;
                Ok(vec![RunStreamEvent::MessageCompleted(message)])
            }
            name if name.starts_with("thread.run.step.") => Ok(Vec::new()),
            name if name.starts_with("thread.run.") => {
                let run: Run = serde_json::from_str(data)
                    .with_context(|| format!("Failed to parse run in {}", name))?;
                Ok(vec![RunStreamEvent::RunUpdated(run)])
            }
            other => {
                tracing::trace!(event = other, "Skipping assistant stream event");
                Ok(Vec::new())
            }
        }
    }

    fn done_event(&self) -> Option<RunStreamEvent> {
        Some(RunStreamEvent::Done)
    }
}

pub fn parse_run_sse_stream(
    response: Response,
) -> Pin<Box<dyn Stream<Item = Result<RunStreamEvent>> + Send>> {
    parse_sse_stream(response.bytes_stream(), AssistantEventParser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn parse(body: &'static str) -> Vec<RunStreamEvent> {
        let source = futures::stream::iter(vec![Ok::<_, std::io::Error>(body.as_bytes())]);
        parse_sse_stream(source, AssistantEventParser)
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_run_stream_with_text_and_completion() {
        let body = concat!(
            "event: thread.run.created\n",
            "data: {\"id\":\"run_1\",\"status\":\"queued\"}\n\n",
            "event: thread.run.step.created\n",
            "data: {\"id\":\"step_1\"}\n\n",
            "event: thread.message.delta\n",
            "data: {\"id\":\"msg_1\",\"delta\":{\"content\":[{\"index\":0,\"type\":\"text\",\"text\":{\"value\":\"Hi\"}}]}}\n\n",
            "event: thread.message.delta\n",
            "data: {\"id\":\"msg_1\",\"delta\":{\"content\":[{\"index\":0,\"type\":\"text\",\"text\":{\"value\":\" there\"}}]}}\n\n",
            "event: thread.run.completed\n",
            "data: {\"id\":\"run_1\",\"status\":\"completed\"}\n\n",
            "event: done\n",
            "data: [DONE]\n\n",
        );

        let events = parse(body).await;
        assert_eq!(events.len(), 5);

        match &events[1] {
            RunStreamEvent::MessageDelta { message_id, text } => {
                assert_eq!(message_id, "msg_1");
                assert_eq!(text, "Hi");
            }
            other => panic!("Expected MessageDelta, got {:?}", other),
        }
        match &events[3] {
            RunStreamEvent::RunUpdated(run) => assert_eq!(run.status, "completed"),
            other => panic!("Expected RunUpdated, got {:?}", other),
        }
        assert!(matches!(events[4], RunStreamEvent::Done));
    }

    #[tokio::test]
    async fn test_error_event_extracts_message() {
        let body = "event: error\ndata: {\"error\":{\"message\":\"rate limited\"}}\n\n";
        let events = parse(body).await;

        match &events[0] {
            RunStreamEvent::Error(message) => assert_eq!(message, "rate limited"),
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_run_payload_is_an_error() {
        let source = futures::stream::iter(vec![Ok::<_, std::io::Error>(
            "event: thread.run.failed\ndata: not-json\n\n".as_bytes(),
        )]);
        let results: Vec<_> = parse_sse_stream(source, AssistantEventParser).collect().await;

        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
