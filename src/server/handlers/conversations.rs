use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::chat::DEFAULT_USER_ID;
use crate::server::{config::AppState, models::chat::Conversation};

const DEFAULT_LIST_LIMIT: usize = 20;

fn default_user_id() -> i64 {
    DEFAULT_USER_ID
}

fn default_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct ConversationsQuery {
    #[serde(rename = "userId", default = "default_user_id")]
    pub user_id: i64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationBody {
    #[serde(rename = "userId", default = "default_user_id")]
    pub user_id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConversationBody {
    #[serde(default)]
    pub title: Option<String>,
}

// The id arrives as a raw path segment so that a malformed one can get the
// same JSON envelope as every other client error.
fn parse_conversation_id(raw: &str) -> Result<i64, Response> {
    raw.parse::<i64>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Invalid conversation id" })),
        )
            .into_response()
    })
}

/// List recent conversations for a user, newest activity first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationsQuery>,
) -> Json<Vec<Conversation>> {
    let conversations = state.store.get_conversations(query.user_id, query.limit).await;
    Json(conversations)
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<CreateConversationBody>,
) -> Response {
    match state
        .store
        .create_conversation(body.user_id, body.title.as_deref())
        .await
    {
        Some(conversation) => {
            info!("Created conversation with id: {}", conversation.id);
            Json(conversation).into_response()
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to create conversation" })),
        )
            .into_response(),
    }
}

/// Fetch one conversation with its full message history.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let conversation_id = match parse_conversation_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state
        .store
        .get_conversation_with_messages(conversation_id)
        .await
    {
        Some(conversation) => {
            Json(json!({ "success": true, "data": conversation })).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Conversation not found" })),
        )
            .into_response(),
    }
}

pub async fn update_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateConversationBody>,
) -> Response {
    let conversation_id = match parse_conversation_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let title = match body.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": "Title cannot be empty" })),
            )
                .into_response();
        }
    };

    if state
        .store
        .update_conversation_title(conversation_id, title)
        .await
    {
        Json(json!({ "success": true, "message": "Conversation title updated" })).into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "Failed to update conversation title" })),
        )
            .into_response()
    }
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let conversation_id = match parse_conversation_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if state.store.delete_conversation(conversation_id).await {
        Json(json!({ "success": true, "message": "Conversation deleted" })).into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "Failed to delete conversation" })),
        )
            .into_response()
    }
}
