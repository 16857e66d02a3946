//! Best-effort notifications to the QR viewer service.
//!
//! Every call here swallows its errors: the viewer being down never affects
//! the session.

use serde_json::json;
use tracing::{debug, warn};
use url::Url;

/// Posts session milestones to `{base}/api/qr`, `/api/connected` and
/// `/api/disconnected`.
#[derive(Debug, Clone)]
pub struct ViewerNotifier {
    http: reqwest::Client,
    base: Option<Url>,
}

impl ViewerNotifier {
    /// Creates a notifier. With no base URL every notification is skipped.
    pub fn new(http: reqwest::Client, base: Option<Url>) -> Self {
        Self { http, base }
    }

    /// Forwards a QR payload.
    pub async fn qr(&self, qr: &str) {
        self.post("api/qr", json!({ "qr": qr })).await;
    }

    /// Reports that the session is connected.
    pub async fn connected(&self) {
        self.post("api/connected", json!({})).await;
    }

    /// Reports that the session was lost.
    pub async fn disconnected(&self) {
        self.post("api/disconnected", json!({})).await;
    }

    async fn post(&self, path: &str, body: serde_json::Value) {
        let Some(base) = &self.base else {
            debug!(path, "no viewer configured, skipping notification");
            return;
        };
        let url = format!("{}/{}", base.as_str().trim_end_matches('/'), path);

        match self.http.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(url = %url, "viewer notified");
            }
            Ok(response) => {
                warn!(url = %url, status = %response.status(), "viewer rejected notification");
            }
            Err(e) => {
                warn!(url = %url, error = %e, "viewer unreachable");
            }
        }
    }
}
