use futures::StreamExt;
use relay_llm::{AssistantClient, ChatClient, ChatRequest, Message, OpenAIClient, RunStreamEvent};
use relay_types::{RunStatus, ToolOutput};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAIClient {
    OpenAIClient::new("sk-test").unwrap().with_base_url(server.uri())
}

fn sse(events: &[(&str, &str)]) -> String {
    events
        .iter()
        .map(|(event, data)| format!("event: {}\ndata: {}\n\n", event, data))
        .collect()
}

#[tokio::test]
async fn create_thread_sends_assistants_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("openai-beta", "assistants=v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_abc", "object": "thread"})))
        .expect(1)
        .mount(&server)
        .await;

    let thread = client_for(&server).create_thread().await.unwrap();
    assert_eq!(thread.id, "thread_abc");
}

#[tokio::test]
async fn create_message_posts_user_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/messages"))
        .and(body_partial_json(json!({"role": "user", "content": "Hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_user",
            "created_at": 1_700_000_000,
            "role": "user",
            "content": [{"type": "text", "text": {"value": "Hello", "annotations": []}}]
        })))
        .mount(&server)
        .await;

    let message = client_for(&server)
        .create_message("thread_1", "Hello")
        .await
        .unwrap();
    assert_eq!(message.id, "msg_user");
    assert!(!message.is_assistant());
}

#[tokio::test]
async fn stream_run_yields_parsed_events() {
    let server = MockServer::start().await;
    let body = sse(&[
        ("thread.run.created", r#"{"id":"run_1","status":"queued"}"#),
        (
            "thread.message.delta",
            r#"{"id":"msg_a","delta":{"content":[{"index":0,"type":"text","text":{"value":"Hi"}}]}}"#,
        ),
        ("thread.run.completed", r#"{"id":"run_1","status":"completed"}"#),
        ("done", "[DONE]"),
    ]);
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs"))
        .and(body_partial_json(json!({"assistant_id": "asst_1", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let stream = client_for(&server)
        .stream_run("thread_1", "asst_1")
        .await
        .unwrap();
    let events: Vec<RunStreamEvent> = stream.map(|e| e.unwrap()).collect().await;

    assert_eq!(events.len(), 4);
    assert!(matches!(&events[1], RunStreamEvent::MessageDelta { text, .. } if text == "Hi"));
    match &events[2] {
        RunStreamEvent::RunUpdated(run) => assert_eq!(run.status(), RunStatus::Completed),
        other => panic!("Expected RunUpdated, got {:?}", other),
    }
    assert!(matches!(events[3], RunStreamEvent::Done));
}

#[tokio::test]
async fn submit_tool_outputs_sends_every_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs/run_1/submit_tool_outputs"))
        .and(body_partial_json(json!({
            "stream": true,
            "tool_outputs": [
                {"tool_call_id": "call_a", "output": "1"},
                {"tool_call_id": "call_b", "output": "2"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[("thread.run.completed", r#"{"id":"run_1","status":"completed"}"#)]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let outputs = vec![ToolOutput::new("call_a", "1"), ToolOutput::new("call_b", "2")];
    let stream = client_for(&server)
        .submit_tool_outputs_stream("thread_1", "run_1", outputs)
        .await
        .unwrap();
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn list_messages_after_follows_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("after", "msg_user"))
        .and(query_param("order", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "msg_1", "created_at": 10, "role": "assistant",
                      "content": [{"type": "text", "text": {"value": "first"}}]}],
            "last_id": "msg_1",
            "has_more": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("after", "msg_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "msg_2", "created_at": 11, "role": "assistant",
                      "content": [{"type": "image_file", "image_file": {"file_id": "f"}}]}],
            "last_id": "msg_2",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let messages = client_for(&server)
        .list_messages_after("thread_1", "msg_user")
        .await
        .unwrap();

    let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["msg_1", "msg_2"]);
    assert_eq!(messages[1].text_segments().count(), 0);
}

#[tokio::test]
async fn retrieve_assistant_lists_function_tools() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants/asst_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "asst_1",
            "name": "Helper",
            "tools": [
                {"type": "code_interpreter"},
                {"type": "function", "function": {"name": "get_current_time", "parameters": {}}}
            ]
        })))
        .mount(&server)
        .await;

    let assistant = client_for(&server).retrieve_assistant("asst_1").await.unwrap();
    assert_eq!(assistant.function_names(), vec!["get_current_time".to_string()]);
}

#[tokio::test]
async fn api_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "rate limit"}})))
        .mount(&server)
        .await;

    let err = client_for(&server).create_thread().await.unwrap_err();
    assert!(err.to_string().contains("429"));
}

#[tokio::test]
async fn chat_completion_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Trip planning"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        })))
        .mount(&server)
        .await;

    let request = ChatRequest::new(
        "gpt-4o-mini",
        vec![Message::system("Title this"), Message::human("Plan a trip")],
    );
    let response = client_for(&server).chat(request).await.unwrap();

    assert_eq!(response.content.as_deref(), Some("Trip planning"));
    assert_eq!(response.usage.unwrap().total_tokens, 15);
}
