//! Shared fixtures for API tests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use relay_client::fake::{FakeClient, FakeFactory};
use relay_client::ClientEvent;
use relay_runtime::{Runtime, RuntimeConfig};
use tempfile::tempdir;

use crate::config::ApiConfig;
use crate::router::create_router;
use crate::state::AppState;

/// A started runtime on a fake client, plus the API state around it.
pub struct TestApp {
    pub state: AppState,
    pub factory: FakeFactory,
    pub media_root: &'static Path,
    _runtime: Runtime,
}

impl TestApp {
    /// Runtime started; the session is not connected yet.
    pub async fn new() -> Self {
        let dir = tempdir().unwrap();
        let root: &'static Path = Box::leak(dir.path().to_path_buf().into_boxed_path());
        std::mem::forget(dir);

        let media_root: &'static Path = Box::leak(root.join("media").into_boxed_path());
        let config = RuntimeConfig::new()
            .with_session_root(root.join("sessions"))
            .with_media(media_root, "http://localhost:8080")
            .with_reset_restart_delay(Duration::from_millis(50));

        let factory = FakeFactory::new(FakeClient::new());
        let mut runtime = Runtime::new(config, Arc::new(factory.clone())).unwrap();
        runtime.start().await.unwrap();

        let api_config = ApiConfig::default().with_media_root(media_root);
        Self {
            state: AppState::from_runtime(api_config, &runtime),
            factory,
            media_root,
            _runtime: runtime,
        }
    }

    /// Runtime started and the session connected.
    pub async fn connected() -> Self {
        let app = Self::new().await;
        app.factory.latest().unwrap().emit(ClientEvent::Ready);
        for _ in 0..100 {
            if app.state.supervisor.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(app.state.supervisor.is_connected());
        app
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(create_router(self.state.clone())).unwrap()
    }
}
