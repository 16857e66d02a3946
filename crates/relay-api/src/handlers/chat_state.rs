//! Chat presence handlers: typing, recording, clear.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use relay_runtime::ChatState;

use crate::error::Result;
use crate::state::AppState;
use crate::types::{ActionResponse, ChatStateRequest};

type Body = std::result::Result<Json<ChatStateRequest>, JsonRejection>;

async fn apply(state: &AppState, body: Body, chat_state: ChatState) -> Result<()> {
    let Json(req) = body?;
    state
        .dispatcher
        .set_chat_state(req.to.as_deref(), chat_state)
        .await?;
    Ok(())
}

/// POST /api/set-typing-state
pub async fn set_typing_state(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<ActionResponse>> {
    apply(&state, body, ChatState::Typing).await?;
    Ok(Json(ActionResponse::ok("typing state set")))
}

/// POST /api/set-recording-state
pub async fn set_recording_state(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<ActionResponse>> {
    apply(&state, body, ChatState::Recording).await?;
    Ok(Json(ActionResponse::ok("recording state set")))
}

/// POST /api/clear-chat-state
pub async fn clear_chat_state(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<ActionResponse>> {
    apply(&state, body, ChatState::Clear).await?;
    Ok(Json(ActionResponse::ok("chat state cleared")))
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::StatusCode;
    use relay_client::fake::Call;
    use relay_models::ChatId;
    use serde_json::json;

    #[tokio::test]
    async fn test_states_on_known_chat() {
        let app = TestApp::connected().await;
        app.factory.client().add_chat("5511999999999@c.us");
        let server = app.server();

        for (path, state) in [
            ("/api/set-typing-state", "typing"),
            ("/api/set-recording-state", "recording"),
            ("/api/clear-chat-state", "clear"),
        ] {
            let response = server
                .post(path)
                .json(&json!({ "to": "5511999999999@c.us" }))
                .await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            assert_eq!(body["success"], true);

            let last = app.factory.client().calls().pop().unwrap();
            assert_eq!(
                last,
                Call::ChatState {
                    chat_id: ChatId::from("5511999999999@c.us"),
                    state,
                }
            );
        }
    }

    #[tokio::test]
    async fn test_plain_number_is_normalized() {
        let app = TestApp::connected().await;
        app.factory.client().add_chat("5511999999999@c.us");
        let server = app.server();

        server
            .post("/api/set-typing-state")
            .json(&json!({ "to": "+55 (11) 99999-9999" }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_missing_to() {
        let app = TestApp::connected().await;
        let server = app.server();

        let response = server.post("/api/set-typing-state").json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("to"));
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_bad_requests() {
        let app = TestApp::connected().await;
        app.factory.client().add_chat("5511@c.us");
        let server = app.server();

        let response = server.post("/api/set-typing-state").text("5511@c.us").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);

        let response = server
            .post("/api/clear-chat-state")
            .json(&json!({ "to": ["5511@c.us"] }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("invalid request body"));

        assert!(!app
            .factory
            .client()
            .calls()
            .iter()
            .any(|c| matches!(c, Call::ChatState { .. })));
    }

    #[tokio::test]
    async fn test_unknown_chat() {
        let app = TestApp::connected().await;
        let server = app.server();

        let response = server
            .post("/api/set-recording-state")
            .json(&json!({ "to": "999@c.us" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_not_connected() {
        let app = TestApp::new().await;
        let server = app.server();

        let response = server
            .post("/api/clear-chat-state")
            .json(&json!({ "to": "999@c.us" }))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("not connected"));
    }
}
