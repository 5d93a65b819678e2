mod common;

use common::spawn_app;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn conversation_row(id: i64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": 1,
        "title": title,
        "created_at": "2025-08-25T12:00:00Z",
        "updated_at": "2025-08-25T12:00:00Z"
    })
}

async fn mock_conversation_insert(
    server: &MockServer,
    expected_title: &str,
    row: serde_json::Value,
) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/conversations"))
        .and(header("apikey", "test-anon-key"))
        .and(body_json(json!([{ "user_id": 1, "title": expected_title }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row])))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn create_conversation_returns_the_new_row() {
    let app = spawn_app().await;
    mock_conversation_insert(&app.supabase, "Trip planning", conversation_row(7, "Trip planning"))
        .await;

    let response = app
        .server
        .post("/api/conversations")
        .json(&json!({ "title": "Trip planning" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], 7);
    assert_eq!(body["user_id"], 1);
    assert_eq!(body["title"], "Trip planning");
}

#[tokio::test]
async fn create_conversation_defaults_title_and_user() {
    let app = spawn_app().await;
    mock_conversation_insert(
        &app.supabase,
        "New Conversation",
        conversation_row(8, "New Conversation"),
    )
    .await;

    let response = app.server.post("/api/conversations").json(&json!({})).await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["title"], "New Conversation");
}

#[tokio::test]
async fn create_conversation_maps_backend_failure_to_500() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/conversations"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "code": "XX000", "message": "boom" })),
        )
        .mount(&app.supabase)
        .await;

    let response = app
        .server
        .post("/api/conversations")
        .json(&json!({ "title": "Trip planning" }))
        .await;

    assert_eq!(response.status_code(), 500);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Failed to create conversation");
}

#[tokio::test]
async fn list_conversations_queries_by_recency_with_defaults() {
    let app = spawn_app().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/conversations"))
        .and(query_param("select", "*"))
        .and(query_param("user_id", "eq.1"))
        .and(query_param("order", "updated_at.desc"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            conversation_row(2, "Most recent"),
            conversation_row(1, "Older"),
        ])))
        .expect(1)
        .mount(&app.supabase)
        .await;

    let response = app.server.get("/api/conversations").await;

    assert_eq!(response.status_code(), 200);
    let body: Vec<serde_json::Value> = response.json();
    assert_eq!(body.len(), 2);
    assert_eq!(body[0]["title"], "Most recent");
}

#[tokio::test]
async fn list_conversations_honors_query_overrides() {
    let app = spawn_app().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/conversations"))
        .and(query_param("user_id", "eq.5"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&app.supabase)
        .await;

    let response = app.server.get("/api/conversations?userId=5&limit=2").await;

    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn list_conversations_absorbs_backend_failure() {
    let app = spawn_app().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/conversations"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "code": "XX000", "message": "boom" })),
        )
        .mount(&app.supabase)
        .await;

    let response = app.server.get("/api/conversations").await;

    assert_eq!(response.status_code(), 200);
    let body: Vec<serde_json::Value> = response.json();
    assert!(body.is_empty());
}

#[tokio::test]
async fn get_conversation_returns_conversation_with_messages() {
    let app = spawn_app().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/conversations"))
        .and(query_param("id", "eq.7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([conversation_row(7, "Trip planning")])),
        )
        .mount(&app.supabase)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("conversation_id", "eq.7"))
        .and(query_param("order", "created_at.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 100,
                "conversation_id": 7,
                "role": "user",
                "content": "hello",
                "created_at": "2025-08-25T12:00:01Z"
            },
            {
                "id": 101,
                "conversation_id": 7,
                "role": "assistant",
                "content": "hi there",
                "created_at": "2025-08-25T12:00:02Z"
            }
        ])))
        .mount(&app.supabase)
        .await;

    let response = app.server.get("/api/conversations/7").await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], 7);
    assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["messages"][0]["role"], "user");
}

#[tokio::test]
async fn missing_conversation_is_a_404() {
    let app = spawn_app().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/conversations"))
        .and(query_param("id", "eq.99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.supabase)
        .await;

    let response = app.server.get("/api/conversations/99").await;

    assert_eq!(response.status_code(), 404);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Conversation not found");
}

#[tokio::test]
async fn invalid_conversation_ids_are_rejected() {
    let app = spawn_app().await;

    let get = app.server.get("/api/conversations/abc").await;
    assert_eq!(get.status_code(), 400);
    let body: serde_json::Value = get.json();
    assert_eq!(body["error"], "Invalid conversation id");

    let put = app
        .server
        .put("/api/conversations/12abc")
        .json(&json!({ "title": "Renamed" }))
        .await;
    assert_eq!(put.status_code(), 400);

    let delete = app.server.delete("/api/conversations/1.5").await;
    assert_eq!(delete.status_code(), 400);
}

#[tokio::test]
async fn update_conversation_title_patches_the_row() {
    let app = spawn_app().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/conversations"))
        .and(query_param("id", "eq.7"))
        .and(body_partial_json(json!({ "title": "Renamed" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.supabase)
        .await;

    let response = app
        .server
        .put("/api/conversations/7")
        .json(&json!({ "title": "Renamed" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Conversation title updated");
}

#[tokio::test]
async fn update_conversation_rejects_a_blank_title() {
    let app = spawn_app().await;

    let blank = app
        .server
        .put("/api/conversations/7")
        .json(&json!({ "title": "   " }))
        .await;
    assert_eq!(blank.status_code(), 400);
    let body: serde_json::Value = blank.json();
    assert_eq!(body["error"], "Title cannot be empty");

    let missing = app.server.put("/api/conversations/7").json(&json!({})).await;
    assert_eq!(missing.status_code(), 400);
}

#[tokio::test]
async fn update_conversation_maps_backend_failure_to_500() {
    let app = spawn_app().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/conversations"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "code": "XX000", "message": "boom" })),
        )
        .mount(&app.supabase)
        .await;

    let response = app
        .server
        .put("/api/conversations/7")
        .json(&json!({ "title": "Renamed" }))
        .await;

    assert_eq!(response.status_code(), 500);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Failed to update conversation title");
}

#[tokio::test]
async fn delete_conversation_removes_the_row() {
    let app = spawn_app().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/conversations"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.supabase)
        .await;

    let response = app.server.delete("/api/conversations/7").await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Conversation deleted");
}

#[tokio::test]
async fn delete_conversation_maps_backend_failure_to_500() {
    let app = spawn_app().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/conversations"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "code": "XX000", "message": "boom" })),
        )
        .mount(&app.supabase)
        .await;

    let response = app.server.delete("/api/conversations/7").await;

    assert_eq!(response.status_code(), 500);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Failed to delete conversation");
}
