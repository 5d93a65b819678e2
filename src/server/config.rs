use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::configuration::Settings;
use crate::server::{
    handlers::{
        chat::chat,
        conversations::{
            create_conversation, delete_conversation, get_conversation, list_conversations,
            update_conversation,
        },
        health_check,
    },
    services::{chat_store::ChatStore, deepseek::DeepSeekService, supabase::SupabaseClient},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ChatStore>,
    pub deepseek: Arc<DeepSeekService>,
}

pub fn configure_app(settings: &Settings) -> Router {
    // Initialize services
    let supabase = SupabaseClient::new(
        settings.supabase_url.clone(),
        settings.supabase_server_key().expose_secret().clone(),
    );
    let store = Arc::new(ChatStore::new(supabase));
    let deepseek = Arc::new(DeepSeekService::new(
        settings.deepseek_api_key.expose_secret().clone(),
        settings.deepseek_api_url.clone(),
        settings.deepseek_model.clone(),
    ));

    app_router(AppState { store, deepseek })
}

async fn log_request(request: Request, next: Next) -> Result<Response, StatusCode> {
    info!("{} {}", request.method(), request.uri().path());
    Ok(next.run(request).await)
}

fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat))
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(get_conversation)
                .put(update_conversation)
                .delete(delete_conversation),
        )
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
