use axum_test::TestServer;
use chatrelay::configuration::Settings;
use chatrelay::server::config::configure_app;
use secrecy::Secret;
use wiremock::MockServer;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

pub struct TestApp {
    pub server: TestServer,
    pub supabase: MockServer,
    pub deepseek: MockServer,
}

/// Build the full router against mock Supabase and DeepSeek servers.
pub async fn spawn_app() -> TestApp {
    init_logging();

    let supabase = MockServer::start().await;
    let deepseek = MockServer::start().await;

    let settings = Settings {
        host: "127.0.0.1".to_string(),
        port: 0,
        supabase_url: supabase.uri(),
        supabase_anon_key: Secret::new("test-anon-key".to_string()),
        supabase_service_role_key: None,
        deepseek_api_key: Secret::new("test-api-key".to_string()),
        deepseek_api_url: format!("{}/v1", deepseek.uri()),
        deepseek_model: "deepseek-chat".to_string(),
    };

    let server = TestServer::new(configure_app(&settings)).unwrap();

    TestApp {
        server,
        supabase,
        deepseek,
    }
}
