use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use relay_runtime::{RelayEvent, SessionError, TurnRequest, Visibility};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    /// Remote thread to continue
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Local conversation id; falls back to `threadId`
    #[serde(default)]
    pub chat_id: Option<String>,
    /// `private` (default) or `public`, applied when the chat is created
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub selected_visibility_type: Option<Visibility>,
}

/// Send a user message to the assistant and stream the run using Server-Sent Events
#[utoipa::path(
    post,
    path = "/api/assistant",
    request_body = AssistantRequest,
    params(
        ("x-user-id" = String, Header, description = "Caller identity set by the gateway")
    ),
    responses(
        (status = 200, description = "Streaming response", content_type = "text/event-stream"),
        (status = 400, description = "Missing message or conversation id"),
        (status = 401, description = "Unauthenticated caller"),
        (status = 500, description = "Unexpected failure")
    ),
    tag = "assistant"
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<AssistantRequest>, JsonRejection>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    // Checked in this order: message, caller, conversation id
    let message = non_empty(req.message)
        .ok_or_else(|| ApiError::from(SessionError::EmptyMessage))?;

    let user = state
        .auth
        .authenticate(&headers)
        .await
        .ok_or(ApiError::Unauthorized)?;

    let mut turn_request = TurnRequest::new(user.id, message);
    if let Some(chat_id) = non_empty(req.chat_id) {
        turn_request = turn_request.with_chat_id(chat_id);
    }
    if let Some(thread_id) = non_empty(req.thread_id) {
        turn_request = turn_request.with_thread_id(thread_id);
    }
    if let Some(visibility) = req.selected_visibility_type {
        turn_request = turn_request.with_visibility(visibility);
    }
    if turn_request.conversation_id().is_none() {
        return Err(SessionError::MissingConversationId.into());
    }

    let turn = state.relay.start_turn(turn_request).await?;

    tracing::info!(
        chat_id = %turn.chat_id,
        thread_id = %turn.thread_id,
        created_chat = turn.created_chat,
        created_thread = turn.created_thread,
        "Relaying turn"
    );

    let events = ReceiverStream::new(state.relay.spawn_turn(turn)).map(to_sse_event);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn to_sse_event(event: RelayEvent) -> Result<Event, Infallible> {
    let name = event.name();
    let sse_event = Event::default().event(name).json_data(&event).unwrap_or_else(|e| {
        tracing::error!(event = name, error = %e, "Failed to serialize relay event");
        Event::default()
            .event("error")
            .data(r#"{"type":"error","message":"event serialization failed"}"#)
    });
    Ok(sse_event)
}
