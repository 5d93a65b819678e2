use axum::Json;
use serde_json::json;

pub mod chat;
pub mod conversations;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}
