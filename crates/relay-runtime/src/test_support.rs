//! Shared helpers for runtime tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::Router;
use relay_client::RawMessage;
use tokio::net::TcpListener;
use url::Url;

/// One request received by a [`CaptureServer`].
#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct CaptureState {
    hits: Arc<Mutex<Vec<Hit>>>,
    status: StatusCode,
}

async fn capture(State(state): State<CaptureState>, uri: Uri, body: Bytes) -> StatusCode {
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    state.hits.lock().unwrap().push(Hit {
        path: uri.path().to_string(),
        body,
    });
    state.status
}

/// Local HTTP listener recording every request it receives.
pub struct CaptureServer {
    base: Url,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl CaptureServer {
    /// Starts a server answering 200 to everything.
    pub async fn start() -> Self {
        Self::start_with_status(StatusCode::OK).await
    }

    /// Starts a server answering `status` to everything.
    pub async fn start_with_status(status: StatusCode) -> Self {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().fallback(capture).with_state(CaptureState {
            hits: hits.clone(),
            status,
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: Url::parse(&format!("http://{}", addr)).unwrap(),
            hits,
        }
    }

    /// URL of `path` on this server.
    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).unwrap()
    }

    /// Requests received so far.
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }
}

/// A plain inbound text message.
pub fn text_message(id: &str, from: &str, body: &str) -> RawMessage {
    RawMessage {
        id: id.to_string(),
        from: from.to_string(),
        to: "15550000000@c.us".to_string(),
        message_type: "chat".to_string(),
        body: body.to_string(),
        timestamp: 1_700_000_000,
        ..RawMessage::default()
    }
}

/// Keeps a temp dir alive for the rest of the test run.
pub fn leak_dir(dir: tempfile::TempDir) -> &'static Path {
    let path: &'static Path = Box::leak(dir.path().to_path_buf().into_boxed_path());
    std::mem::forget(dir);
    path
}
