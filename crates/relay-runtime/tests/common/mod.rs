// Scripted in-process assistant provider and a journaling store

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use relay_llm::{AssistantClient, AssistantInfo, RunEventStream, RunStreamEvent, ThreadHandle, ThreadMessage};
use relay_persist::{InMemoryMessageStore, MessageStore, PersistError};
use relay_runtime::{Relay, RelayConfig, RelayEvent, Role};
use relay_types::{Chat, Message, ToolOutput};
use serde_json::json;
use tokio::sync::mpsc;

pub type Journal = Arc<Mutex<Vec<String>>>;

/// A scripted stream segment; `Pending` never yields
pub enum Segment {
    Events(Vec<Result<RunStreamEvent>>),
    Pending,
}

pub struct FakeAssistant {
    journal: Journal,
    thread_delay: Duration,
    threads_created: AtomicUsize,
    messages_created: AtomicUsize,
    segments: Mutex<VecDeque<Segment>>,
    submissions: Mutex<Vec<Vec<ToolOutput>>>,
    thread: Mutex<Vec<ThreadMessage>>,
    replies: Mutex<Vec<ThreadMessage>>,
    declared_tools: Vec<String>,
}

impl FakeAssistant {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            thread_delay: Duration::ZERO,
            threads_created: AtomicUsize::new(0),
            messages_created: AtomicUsize::new(0),
            segments: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            thread: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            declared_tools: Vec::new(),
        }
    }

    pub fn with_thread_delay(mut self, delay: Duration) -> Self {
        self.thread_delay = delay;
        self
    }

    pub fn with_declared_tools(mut self, names: &[&str]) -> Self {
        self.declared_tools = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Next stream returned by `stream_run` / `submit_tool_outputs_stream`
    pub fn push_segment(&self, events: Vec<RunStreamEvent>) {
        self.segments
            .lock()
            .unwrap()
            .push_back(Segment::Events(events.into_iter().map(Ok).collect()));
    }

    pub fn push_raw_segment(&self, segment: Segment) {
        self.segments.lock().unwrap().push_back(segment);
    }

    /// Messages already on the thread before the turn
    pub fn seed_thread(&self, messages: Vec<ThreadMessage>) {
        self.thread.lock().unwrap().extend(messages);
    }

    /// Messages the assistant "writes" once a run starts
    pub fn set_replies(&self, messages: Vec<ThreadMessage>) {
        *self.replies.lock().unwrap() = messages;
    }

    pub fn threads_created(&self) -> usize {
        self.threads_created.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.submissions.lock().unwrap().clone()
    }

    fn log(&self, entry: impl Into<String>) {
        self.journal.lock().unwrap().push(entry.into());
    }

    fn next_segment(&self) -> Result<RunEventStream> {
        match self.segments.lock().unwrap().pop_front() {
            Some(Segment::Events(events)) => Ok(Box::pin(futures::stream::iter(events))),
            Some(Segment::Pending) => Ok(Box::pin(futures::stream::pending::<Result<RunStreamEvent>>())),
            None => Err(anyhow!("no scripted run segment left")),
        }
    }
}

#[async_trait]
impl AssistantClient for FakeAssistant {
    async fn create_thread(&self) -> Result<ThreadHandle> {
        tokio::time::sleep(self.thread_delay).await;
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
        self.log("create_thread");
        Ok(ThreadHandle {
            id: format!("thread_{}", n),
        })
    }

    async fn create_message(&self, _thread_id: &str, content: &str) -> Result<ThreadMessage> {
        let n = self.messages_created.fetch_add(1, Ordering::SeqCst) + 1;
        self.log("create_message");
        let message = thread_message(&format!("msg_user_{}", n), "user", 1_000 + n as i64, &[content]);
        self.thread.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn stream_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<RunEventStream> {
        self.log("stream_run");
        let replies = std::mem::take(&mut *self.replies.lock().unwrap());
        self.thread.lock().unwrap().extend(replies);
        self.next_segment()
    }

    async fn submit_tool_outputs_stream(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<RunEventStream> {
        self.log(format!("submit_tool_outputs:{}", outputs.len()));
        self.submissions.lock().unwrap().push(outputs);
        self.next_segment()
    }

    async fn list_messages_after(
        &self,
        _thread_id: &str,
        after_message_id: &str,
    ) -> Result<Vec<ThreadMessage>> {
        self.log("list_messages_after");
        let thread = self.thread.lock().unwrap();
        let start = thread
            .iter()
            .position(|m| m.id == after_message_id)
            .map(|i| i + 1)
            .unwrap_or(0);
        Ok(thread[start..].to_vec())
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<AssistantInfo> {
        let tools: Vec<_> = self
            .declared_tools
            .iter()
            .map(|name| json!({"type": "function", "function": {"name": name}}))
            .collect();
        Ok(serde_json::from_value(json!({"id": assistant_id, "tools": tools}))?)
    }
}

/// In-memory store that journals writes
pub struct RecordingStore {
    inner: InMemoryMessageStore,
    journal: Journal,
    fail_assistant_saves: AtomicBool,
}

impl RecordingStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: InMemoryMessageStore::new(),
            journal,
            fail_assistant_saves: AtomicBool::new(false),
        }
    }

    /// Reject every batch that carries an assistant message
    pub fn fail_assistant_saves(&self) {
        self.fail_assistant_saves.store(true, Ordering::SeqCst);
    }

    pub async fn chat_count(&self) -> usize {
        self.inner.chat_count().await
    }
}

#[async_trait]
impl MessageStore for RecordingStore {
    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Option<Chat>, PersistError> {
        self.inner.get_chat_by_id(chat_id).await
    }

    async fn save_chat(&self, chat: Chat) -> Result<(), PersistError> {
        self.journal.lock().unwrap().push("save_chat".to_string());
        self.inner.save_chat(chat).await
    }

    async fn set_chat_thread(&self, chat_id: &str, thread_id: &str) -> Result<String, PersistError> {
        self.inner.set_chat_thread(chat_id, thread_id).await
    }

    async fn save_messages(&self, messages: &[Message]) -> Result<(), PersistError> {
        if self.fail_assistant_saves.load(Ordering::SeqCst)
            && messages.iter().any(|m| m.role == Role::Assistant)
        {
            return Err(PersistError::Internal(
                "write to /var/lib/relay/messages failed: disk full".to_string(),
            ));
        }
        for message in messages {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            self.journal.lock().unwrap().push(format!("save_message:{}", role));
        }
        self.inner.save_messages(messages).await
    }

    async fn get_messages(&self, chat_id: &str) -> Result<Vec<Message>, PersistError> {
        self.inner.get_messages(chat_id).await
    }
}

pub struct Harness {
    pub journal: Journal,
    pub client: Arc<FakeAssistant>,
    pub store: Arc<RecordingStore>,
    pub relay: Relay,
}

pub fn harness(configure: impl FnOnce(FakeAssistant) -> FakeAssistant, config: RelayConfig) -> Harness {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let client = Arc::new(configure(FakeAssistant::new(Arc::clone(&journal))));
    let store = Arc::new(RecordingStore::new(Arc::clone(&journal)));

    let relay = Relay::builder()
        .client(client.clone())
        .store(store.clone())
        .assistant_id("asst_test")
        .config(config)
        .build()
        .unwrap();

    Harness {
        journal,
        client,
        store,
        relay,
    }
}

pub async fn collect(mut rx: mpsc::Receiver<RelayEvent>) -> Vec<RelayEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub fn run_event(id: &str, status: &str) -> RunStreamEvent {
    RunStreamEvent::RunUpdated(serde_json::from_value(json!({"id": id, "status": status})).unwrap())
}

pub fn failed_run(id: &str, code: &str, message: &str) -> RunStreamEvent {
    RunStreamEvent::RunUpdated(
        serde_json::from_value(json!({
            "id": id,
            "status": "failed",
            "last_error": {"code": code, "message": message}
        }))
        .unwrap(),
    )
}

/// `requires_action` run asking for `(call_id, function, arguments)` calls
pub fn requires_tools(id: &str, calls: &[(&str, &str, &str)]) -> RunStreamEvent {
    let tool_calls: Vec<_> = calls
        .iter()
        .map(|(call_id, name, args)| {
            json!({"id": call_id, "type": "function", "function": {"name": name, "arguments": args}})
        })
        .collect();
    RunStreamEvent::RunUpdated(
        serde_json::from_value(json!({
            "id": id,
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {"tool_calls": tool_calls}
            }
        }))
        .unwrap(),
    )
}

pub fn delta(message_id: &str, text: &str) -> RunStreamEvent {
    RunStreamEvent::MessageDelta {
        message_id: message_id.to_string(),
        text: text.to_string(),
    }
}

pub fn thread_message(id: &str, role: &str, created_at: i64, texts: &[&str]) -> ThreadMessage {
    let content: Vec<_> = texts
        .iter()
        .map(|t| json!({"type": "text", "text": {"value": t, "annotations": []}}))
        .collect();
    serde_json::from_value(json!({
        "id": id,
        "created_at": created_at,
        "role": role,
        "content": content
    }))
    .unwrap()
}

/// Unix seconds a little after now (plus `offset`), so replies sort after
/// the user message
pub fn soon(offset: i64) -> i64 {
    chrono::Utc::now().timestamp() + 10 + offset
}
