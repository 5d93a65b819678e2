use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::{HeaderValue, StatusCode},
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::server::{
    config::AppState,
    models::chat::{NewMessage, Role},
    services::chat_store::generate_conversation_title,
    services::deepseek::{ChatMessage, StreamUpdate},
};

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant powered by DeepSeek. You can help users with various tasks including:
- Answering questions
- Providing explanations
- Helping with problem-solving
- Creative writing
- Code assistance

Be concise, helpful, and friendly in your responses.";

pub(crate) const DEFAULT_USER_ID: i64 = 1;

/// Ceiling on how long one completion may stream before the response is
/// closed.
const MAX_STREAM_DURATION: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<NewMessage>,
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

/// Stream a model completion back to the client as SSE, persisting the
/// exchange around it.
///
/// A missing conversation id means this is the first turn: a conversation is
/// created and its id returned in the `x-conversation-id` header. Persistence
/// failures degrade to an unpersisted stream rather than an error response.
pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    info!("Chat request with {} messages", request.messages.len());

    let conversation_id = match request.conversation_id {
        Some(id) => Some(id),
        None => {
            let title = request
                .messages
                .iter()
                .find(|m| m.role == Role::User)
                .map(|m| generate_conversation_title(&m.content));

            match state
                .store
                .create_conversation(DEFAULT_USER_ID, title.as_deref())
                .await
            {
                Some(conversation) => Some(conversation.id),
                None => {
                    warn!("Streaming without persistence: conversation could not be created");
                    None
                }
            }
        }
    };

    // The inbound user message is saved before the model is called, so it
    // survives even if the stream never completes.
    if let Some(id) = conversation_id {
        if let Some(last) = request.messages.last() {
            if last.role == Role::User
                && state
                    .store
                    .save_message(id, last.role, &last.content)
                    .await
                    .is_none()
            {
                warn!("Failed to persist user message for conversation {}", id);
            }
        }
    }

    let mut outbound = Vec::with_capacity(request.messages.len() + 1);
    outbound.push(ChatMessage::system(SYSTEM_PROMPT));
    outbound.extend(request.messages.iter().map(ChatMessage::from));

    let mut rx = match state.deepseek.stream_chat(outbound).await {
        Ok(rx) => rx,
        Err(e) => {
            error!("Failed to start model stream: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to process chat request" })),
            )
                .into_response();
        }
    };

    let store = state.store.clone();
    let deadline = Instant::now() + MAX_STREAM_DURATION;

    let stream = async_stream::stream! {
        let mut assistant_reply = String::new();

        loop {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(StreamUpdate::Chunk { data, content })) => {
                    if let Some(content) = content {
                        assistant_reply.push_str(&content);
                    }
                    yield Ok::<Event, Infallible>(Event::default().data(data));
                }
                Ok(Some(StreamUpdate::Done)) => {
                    if let Some(id) = conversation_id {
                        if !assistant_reply.is_empty()
                            && store
                                .save_message(id, Role::Assistant, &assistant_reply)
                                .await
                                .is_none()
                        {
                            warn!("Failed to persist assistant reply for conversation {}", id);
                        }
                    }
                    yield Ok(Event::default().data("[DONE]"));
                    break;
                }
                Ok(None) => {
                    // Ended without a completion marker; the partial reply is
                    // not persisted.
                    warn!("Model stream ended unexpectedly");
                    break;
                }
                Err(_) => {
                    warn!(
                        "Model stream exceeded {}s, closing the response",
                        MAX_STREAM_DURATION.as_secs()
                    );
                    break;
                }
            }
        }
    };

    let mut response = Sse::new(stream).into_response();
    if let Some(id) = conversation_id {
        if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
            response.headers_mut().insert("x-conversation-id", value);
        }
    }
    response
}
