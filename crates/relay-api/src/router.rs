//! Router configuration and server setup.

use std::future::Future;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::handlers;
use crate::state::AppState;

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Creates the API router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let media = ServeDir::new(&state.config.media_root);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        // Session
        .route("/reset-session", post(handlers::reset_session))
        .route("/api/request-qr", post(handlers::request_qr))
        .route("/api/qr", get(handlers::qr_code))
        // Chat state
        .route("/api/set-typing-state", post(handlers::set_typing_state))
        .route("/api/set-recording-state", post(handlers::set_recording_state))
        .route("/api/clear-chat-state", post(handlers::clear_chat_state))
        // Messages
        .route("/api/send-whatsapp-message", post(handlers::send_message))
        .nest_service("/media", media)
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
pub async fn serve(config: ApiConfig, state: AppState) -> Result<(), std::io::Error> {
    serve_with_shutdown(config, state, std::future::pending()).await
}

/// Starts the API server and stops accepting requests once `signal` resolves.
pub async fn serve_with_shutdown<F>(
    config: ApiConfig,
    state: AppState,
    signal: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(signal)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_root_text() {
        let app = TestApp::new().await;
        let server = app.server();

        let response = server.get("/").await;
        response.assert_status_ok();
        response.assert_text(handlers::ROOT_TEXT);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = TestApp::connected().await;
        let server = app.server();

        let response = server.get("/api/health").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["session_status"], "CONNECTED");
        assert!(!body["version"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_media_is_served() {
        let app = TestApp::new().await;
        std::fs::write(app.media_root.join("abc.jpeg"), b"jpeg-bytes").unwrap();
        let server = app.server();

        let response = server.get("/media/abc.jpeg").await;
        response.assert_status_ok();
        assert_eq!(&response.as_bytes()[..], b"jpeg-bytes");

        server
            .get("/media/missing.jpeg")
            .await
            .assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let app = TestApp::new().await;
        let server = app.server();

        let response = server
            .get("/api/health")
            .add_header(
                axum::http::header::ORIGIN,
                HeaderValue::from_static("http://qr.local"),
            )
            .await;
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_cors_origin_list() {
        let app = TestApp::new().await;
        let mut state = app.state.clone();
        state.config = std::sync::Arc::new(
            ApiConfig::default()
                .with_media_root(app.media_root)
                .with_cors_origins(vec!["http://qr.local".to_string()]),
        );
        let server = TestServer::new(create_router(state)).unwrap();

        let allowed = server
            .get("/api/health")
            .add_header(
                axum::http::header::ORIGIN,
                HeaderValue::from_static("http://qr.local"),
            )
            .await;
        assert_eq!(
            allowed.headers()["access-control-allow-origin"],
            "http://qr.local"
        );

        let other = server
            .get("/api/health")
            .add_header(
                axum::http::header::ORIGIN,
                HeaderValue::from_static("http://evil.local"),
            )
            .await;
        assert!(!other.headers().contains_key("access-control-allow-origin"));
    }
}
