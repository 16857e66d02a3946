//! Outbound dispatcher: turns send requests into client calls.

use std::sync::Arc;

use relay_client::{
    ClientError, MediaPayload, OutgoingContent, SendOptions, SentMessage, WhatsAppClient,
};
use relay_models::{ChatId, Destination, MediaType, OutboundMedia, OutboundRequest, SendPlan};
use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::supervisor::ConnectionSupervisor;

/// Presence state shown to the other party of a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Typing,
    Recording,
    Clear,
}

impl ChatState {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatState::Typing => "typing",
            ChatState::Recording => "recording",
            ChatState::Clear => "clear",
        }
    }
}

/// Sends messages and presence states through the live client.
///
/// Every operation requires a connected session and fails fast otherwise;
/// nothing is queued.
#[derive(Clone)]
pub struct OutboundDispatcher {
    supervisor: Arc<ConnectionSupervisor>,
}

impl OutboundDispatcher {
    pub fn new(supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self { supervisor }
    }

    async fn client(&self) -> Result<Arc<dyn WhatsAppClient>, DispatchError> {
        self.supervisor
            .connected_client()
            .await
            .ok_or(DispatchError::NotConnected)
    }

    /// Sends a text or media message and returns the provider message ID.
    ///
    /// The request is validated before the connection is checked, so a
    /// malformed request never reaches the client. A failed send is retried
    /// exactly once through an explicitly resolved chat object.
    pub async fn send(&self, request: &OutboundRequest) -> Result<SentMessage, DispatchError> {
        let plan = request.validate()?;
        let client = self.client().await?;

        let chat_id = resolve_destination(client.as_ref(), &plan.destination).await;
        let content = build_content(client.as_ref(), &plan).await?;

        debug!(
            chat_id = %chat_id,
            voice_note = content.is_voice_note(),
            "dispatching message"
        );

        let primary = match client.send_message(&chat_id, &content).await {
            Ok(sent) => {
                info!(chat_id = %chat_id, message_id = %sent.message_id, "message sent");
                return Ok(sent);
            }
            Err(e) => e,
        };

        warn!(chat_id = %chat_id, error = %primary, "send failed, retrying through chat lookup");
        let fallback = match client.get_chat_by_id(&chat_id).await {
            Ok(Some(chat)) => chat.send_message(&content).await,
            Ok(None) => Err(ClientError::ChatNotFound(chat_id.to_string())),
            Err(e) => Err(e),
        };

        match fallback {
            Ok(sent) => {
                info!(chat_id = %chat_id, message_id = %sent.message_id, "message sent on retry");
                Ok(sent)
            }
            Err(e) if e.is_chat_not_found() || primary.is_chat_not_found() => {
                warn!(chat_id = %chat_id, error = %e, "destination not found");
                Err(DispatchError::DestinationNotFound(chat_id.to_string()))
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "retry failed");
                Err(DispatchError::SendFailed(format!(
                    "{} (retry: {})",
                    primary, e
                )))
            }
        }
    }

    /// Sets a presence state on the chat behind `to`.
    pub async fn set_chat_state(
        &self,
        to: Option<&str>,
        state: ChatState,
    ) -> Result<(), DispatchError> {
        let to = to
            .map(str::trim)
            .filter(|to| !to.is_empty())
            .ok_or_else(|| {
                DispatchError::InvalidRequest("parameter \"to\" is required".to_string())
            })?;
        let chat_id = Destination::parse(to)?.chat_id();
        let client = self.client().await?;

        let chat = match client.get_chat_by_id(&chat_id).await {
            Ok(Some(chat)) => chat,
            Ok(None) => return Err(DispatchError::DestinationNotFound(chat_id.to_string())),
            Err(e) if e.is_chat_not_found() => {
                return Err(DispatchError::DestinationNotFound(chat_id.to_string()))
            }
            Err(e) => return Err(DispatchError::SendFailed(e.to_string())),
        };

        let result = match state {
            ChatState::Typing => chat.send_state_typing().await,
            ChatState::Recording => chat.send_state_recording().await,
            ChatState::Clear => chat.clear_state().await,
        };
        result.map_err(|e| DispatchError::SendFailed(e.to_string()))?;

        debug!(chat_id = %chat_id, state = state.as_str(), "chat state set");
        Ok(())
    }
}

/// Normalizes the destination and, for bare numbers, asks the client for the
/// registered ID. The lookup is best-effort.
async fn resolve_destination(client: &dyn WhatsAppClient, destination: &Destination) -> ChatId {
    let fallback = destination.chat_id();
    let Destination::Number(number) = destination else {
        return fallback;
    };

    match client.get_number_id(number).await {
        Ok(Some(registered)) => registered,
        Ok(None) => {
            warn!(number = %number, "number not registered, sending anyway");
            fallback
        }
        Err(ClientError::Unsupported(capability)) => {
            warn!(number = %number, capability, "client cannot look numbers up, sending anyway");
            fallback
        }
        Err(e) => {
            warn!(number = %number, error = %e, "number lookup failed, sending anyway");
            fallback
        }
    }
}

async fn build_content(
    client: &dyn WhatsAppClient,
    plan: &SendPlan,
) -> Result<OutgoingContent, DispatchError> {
    let Some(media) = &plan.media else {
        return text_content(plan);
    };

    if let MediaType::Unsupported(kind) = &media.media_type {
        return match &plan.text {
            Some(text) => {
                warn!(media_type = %kind, "unsupported media type, sending text instead");
                Ok(OutgoingContent::Text(text.clone()))
            }
            None => Err(DispatchError::UnsupportedMediaKind(kind.clone())),
        };
    }

    let payload = client
        .fetch_media(&media.url)
        .await
        .map_err(|e| DispatchError::SendFailed(format!("could not fetch media: {}", e)))?;

    Ok(OutgoingContent::Media {
        options: send_options(media, plan.text.as_deref(), &payload),
        media: payload,
    })
}

fn text_content(plan: &SendPlan) -> Result<OutgoingContent, DispatchError> {
    plan.text
        .clone()
        .map(OutgoingContent::Text)
        .ok_or_else(|| DispatchError::InvalidRequest("no text message or media provided".into()))
}

fn send_options(media: &OutboundMedia, text: Option<&str>, payload: &MediaPayload) -> SendOptions {
    let voice = media.media_type.is_voice();
    SendOptions {
        // Voice notes cannot carry a caption.
        caption: if voice {
            None
        } else {
            media.caption.clone().or_else(|| text.map(str::to_string))
        },
        filename: media.filename.clone().or_else(|| payload.filename.clone()),
        send_audio_as_voice: voice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::test_support::leak_dir;
    use crate::viewer::ViewerNotifier;
    use relay_client::fake::{Call, FakeClient, FakeFactory};
    use relay_client::ClientEvent;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    async fn dispatcher(connected: bool) -> (OutboundDispatcher, FakeClient) {
        let root = leak_dir(tempdir().unwrap());
        let config = RuntimeConfig::new().with_session_root(root);
        let factory = FakeFactory::new(FakeClient::new());
        let viewer = ViewerNotifier::new(reqwest::Client::new(), None);
        let (supervisor, mut events) =
            ConnectionSupervisor::new(&config, Arc::new(factory.clone()), viewer);

        supervisor.start().await.unwrap();
        if connected {
            factory.latest().unwrap().emit(ClientEvent::Ready);
            let event = events.recv().await.unwrap();
            supervisor.handle_event(event).await;
        }
        drop(events);

        (OutboundDispatcher::new(supervisor), factory.client().clone())
    }

    fn ogg() -> MediaPayload {
        MediaPayload {
            mime_type: "audio/ogg".to_string(),
            data: b"ogg".to_vec(),
            filename: Some("y.ogg".to_string()),
        }
    }

    #[tokio::test]
    async fn test_plain_text_to_formatted_number() {
        let (dispatcher, client) = dispatcher(true).await;

        let sent = dispatcher
            .send(&OutboundRequest::text("+1 (555) 123-4567", "hi"))
            .await
            .unwrap();

        assert_eq!(sent.message_id, "fake-1");
        assert_eq!(
            client.sends(),
            vec![Call::Send {
                chat_id: ChatId::from("15551234567@c.us"),
                content: OutgoingContent::Text("hi".to_string()),
            }]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_missing_number_lookup_is_logged() {
        let (dispatcher, client) = dispatcher(true).await;

        dispatcher
            .send(&OutboundRequest::text("5511999999999", "hi"))
            .await
            .unwrap();

        assert!(client
            .calls()
            .contains(&Call::GetNumberId("5511999999999".to_string())));
        assert!(logs_contain("client cannot look numbers up, sending anyway"));
    }

    #[tokio::test]
    async fn test_registered_number_is_adopted() {
        let (dispatcher, client) = dispatcher(true).await;
        client.add_number("5511999999999", "551199999999@c.us");

        dispatcher
            .send(&OutboundRequest::text("5511999999999", "hi"))
            .await
            .unwrap();

        assert!(matches!(
            &client.sends()[0],
            Call::Send { chat_id, .. } if chat_id.as_str() == "551199999999@c.us"
        ));
    }

    #[tokio::test]
    async fn test_group_audio_is_voice_note() {
        let (dispatcher, client) = dispatcher(true).await;
        client.set_remote_media(ogg());

        dispatcher
            .send(&OutboundRequest::media("123@g.us", "audio", "https://x/y.ogg"))
            .await
            .unwrap();

        let sends = client.sends();
        assert_eq!(sends.len(), 1);
        match &sends[0] {
            Call::Send { chat_id, content } => {
                assert_eq!(chat_id.as_str(), "123@g.us");
                assert!(content.is_voice_note());
            }
            other => panic!("unexpected call {:?}", other),
        }
        assert!(!client
            .calls()
            .iter()
            .any(|c| matches!(c, Call::GetNumberId(_))));
    }

    #[tokio::test]
    async fn test_image_carries_caption() {
        let (dispatcher, client) = dispatcher(true).await;
        client.set_remote_media(MediaPayload {
            mime_type: "image/png".to_string(),
            data: vec![1, 2, 3],
            filename: None,
        });

        let mut request = OutboundRequest::media("15551234567", "image", "https://x/a.png");
        request.caption = Some("look".to_string());
        dispatcher.send(&request).await.unwrap();

        match &client.sends()[0] {
            Call::Send {
                content: OutgoingContent::Media { options, .. },
                ..
            } => {
                assert_eq!(options.caption.as_deref(), Some("look"));
                assert!(!options.send_audio_as_voice);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsupported_kind_falls_back_to_text() {
        let (dispatcher, client) = dispatcher(true).await;

        let mut request = OutboundRequest::media("15551234567", "sticker", "https://x/s.webp");
        request.message = Some("fallback".to_string());
        dispatcher.send(&request).await.unwrap();

        assert!(matches!(
            &client.sends()[0],
            Call::Send { content: OutgoingContent::Text(text), .. } if text == "fallback"
        ));

        let request = OutboundRequest::media("15551234567", "sticker", "https://x/s.webp");
        assert!(matches!(
            dispatcher.send(&request).await,
            Err(DispatchError::UnsupportedMediaKind(kind)) if kind == "sticker"
        ));
    }

    #[tokio::test]
    async fn test_retry_through_chat_lookup() {
        let (dispatcher, client) = dispatcher(true).await;
        client.add_chat("15551234567@c.us");
        client.fail_next_send(ClientError::Send("chat not hydrated".to_string()));

        let sent = dispatcher
            .send(&OutboundRequest::text("15551234567", "hi"))
            .await
            .unwrap();

        assert_eq!(sent.message_id, "fake-1");
        let sends = client.sends();
        assert_eq!(sends.len(), 2);
        assert!(matches!(sends[1], Call::ChatSend { .. }));
    }

    #[tokio::test]
    async fn test_retry_happens_once() {
        let (dispatcher, client) = dispatcher(true).await;
        client.add_chat("15551234567@c.us");
        client.fail_next_send(ClientError::Send("first".to_string()));
        client.fail_next_chat_send(ClientError::Send("second".to_string()));

        let err = dispatcher
            .send(&OutboundRequest::text("15551234567", "hi"))
            .await
            .unwrap_err();

        match err {
            DispatchError::SendFailed(detail) => {
                assert!(detail.contains("first"));
                assert!(detail.contains("second"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(client.sends().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let (dispatcher, client) = dispatcher(true).await;
        client.fail_next_send(ClientError::Send("no such chat".to_string()));

        let err = dispatcher
            .send(&OutboundRequest::text("15551234567", "hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::DestinationNotFound(_)));
    }

    #[tokio::test]
    async fn test_not_connected_fails_fast() {
        let (dispatcher, client) = dispatcher(false).await;

        let err = dispatcher
            .send(&OutboundRequest::text("15551234567", "hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::NotConnected));
        assert!(client.sends().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_client() {
        let (dispatcher, client) = dispatcher(false).await;

        let err = dispatcher
            .send(&OutboundRequest {
                message: Some("hi".to_string()),
                ..OutboundRequest::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidRequest(_)));
        assert_eq!(client.calls(), vec![Call::Connect]);
    }

    #[tokio::test]
    async fn test_chat_states() {
        let (dispatcher, client) = dispatcher(true).await;
        client.add_chat("15551234567@c.us");

        dispatcher
            .set_chat_state(Some("15551234567"), ChatState::Typing)
            .await
            .unwrap();
        dispatcher
            .set_chat_state(Some("15551234567@c.us"), ChatState::Clear)
            .await
            .unwrap();

        let states: Vec<&'static str> = client
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ChatState { state, .. } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec!["typing", "clear"]);

        assert!(matches!(
            dispatcher
                .set_chat_state(Some("999@c.us"), ChatState::Recording)
                .await,
            Err(DispatchError::DestinationNotFound(_))
        ));
        assert!(matches!(
            dispatcher.set_chat_state(None, ChatState::Typing).await,
            Err(DispatchError::InvalidRequest(_))
        ));
    }
}
