//! Outbound message handler.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use relay_models::OutboundRequest;

use crate::error::Result;
use crate::state::AppState;
use crate::types::SendMessageResponse;

/// POST /api/send-whatsapp-message - Send text or media.
pub async fn send_message(
    State(state): State<AppState>,
    body: std::result::Result<Json<OutboundRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>> {
    let Json(req) = body?;
    let sent = state.dispatcher.send(&req).await?;

    Ok(Json(SendMessageResponse {
        success: true,
        message: "message sent".to_string(),
        provider_message_id: sent.message_id,
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::StatusCode;
    use relay_client::fake::Call;
    use relay_client::{ClientError, MediaPayload, OutgoingContent};
    use relay_models::ChatId;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_text() {
        let app = TestApp::connected().await;
        let server = app.server();

        let response = server
            .post("/api/send-whatsapp-message")
            .json(&json!({ "to": "+1 (555) 123-4567", "message": "hi" }))
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["providerMessageId"], "fake-1");

        let sends = app.factory.client().sends();
        assert_eq!(
            sends,
            vec![Call::Send {
                chat_id: ChatId::from("15551234567@c.us"),
                content: OutgoingContent::Text("hi".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_send_voice_note_to_group() {
        let app = TestApp::connected().await;
        app.factory.client().set_remote_media(MediaPayload {
            mime_type: "audio/ogg".to_string(),
            data: b"ogg".to_vec(),
            filename: Some("y.ogg".to_string()),
        });
        let server = app.server();

        server
            .post("/api/send-whatsapp-message")
            .json(&json!({
                "to": "123@g.us",
                "mediaType": "audio",
                "mediaUrl": "https://x/y.ogg"
            }))
            .await
            .assert_status_ok();

        match app.factory.client().sends().as_slice() {
            [Call::Send { chat_id, content }] => {
                assert_eq!(chat_id.as_str(), "123@g.us");
                assert!(content.is_voice_note());
            }
            other => panic!("unexpected sends: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_to_never_reaches_client() {
        let app = TestApp::connected().await;
        let server = app.server();
        let before = app.factory.client().calls().len();

        let response = server
            .post("/api/send-whatsapp-message")
            .json(&json!({ "message": "hi" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);

        assert_eq!(app.factory.client().calls().len(), before);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_bad_requests() {
        let app = TestApp::connected().await;
        let server = app.server();
        let before = app.factory.client().calls().len();

        let response = server
            .post("/api/send-whatsapp-message")
            .json(&json!({ "to": 5511999, "message": "hi" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("invalid request body"));

        let response = server
            .post("/api/send-whatsapp-message")
            .text("to=5511&message=hi")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);

        assert_eq!(app.factory.client().calls().len(), before);
    }

    #[tokio::test]
    async fn test_invalid_media_url() {
        let app = TestApp::connected().await;
        let server = app.server();

        server
            .post("/api/send-whatsapp-message")
            .json(&json!({
                "to": "5511@c.us",
                "mediaType": "image",
                "mediaUrl": "file:///etc/passwd"
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        assert!(app.factory.client().sends().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let app = TestApp::connected().await;
        let client = app.factory.client();
        client.fail_next_send(ClientError::ChatNotFound("5511@c.us".to_string()));
        let server = app.server();

        let response = server
            .post("/api/send-whatsapp-message")
            .json(&json!({ "to": "5511@c.us", "message": "hi" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_send_failure() {
        let app = TestApp::connected().await;
        let client = app.factory.client();
        client.add_chat("5511@c.us");
        client.fail_next_send(ClientError::Send("chat not hydrated".to_string()));
        client.fail_next_chat_send(ClientError::Send("still broken".to_string()));
        let server = app.server();

        let response = server
            .post("/api/send-whatsapp-message")
            .json(&json!({ "to": "5511@c.us", "message": "hi" }))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("chat not hydrated"));
        assert!(error.contains("still broken"));
    }

    #[tokio::test]
    async fn test_retry_succeeds() {
        let app = TestApp::connected().await;
        let client = app.factory.client();
        client.add_chat("5511@c.us");
        client.fail_next_send(ClientError::Send("chat not hydrated".to_string()));
        let server = app.server();

        let response = server
            .post("/api/send-whatsapp-message")
            .json(&json!({ "to": "5511@c.us", "message": "hi" }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["providerMessageId"], "fake-1");
    }

    #[tokio::test]
    async fn test_not_connected() {
        let app = TestApp::new().await;
        let server = app.server();

        server
            .post("/api/send-whatsapp-message")
            .json(&json!({ "to": "5511@c.us", "message": "hi" }))
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }
}
