//! Runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use relay_models::SessionIdentity;
use url::Url;

use crate::relay::SelfSentRouting;

/// Identity used when none is configured.
pub const DEFAULT_IDENTITY: &str = "bot-principal";

/// Restart backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first restart.
    pub base: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Consecutive failures after which restarts are logged as alerts.
    pub alert_after: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            max: Duration::from_secs(60),
            alert_after: 5,
        }
    }
}

/// Configuration for the runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Stable session identity.
    pub identity: SessionIdentity,
    /// Root holding the per-identity session directories.
    pub session_root: PathBuf,
    /// Root holding stored media artifacts.
    pub media_root: PathBuf,
    /// Public base URL media links are built from.
    pub public_url: String,
    /// Primary inbound webhook.
    pub webhook_url: Option<Url>,
    /// Webhook receiving self-sent envelopes.
    pub takeover_webhook_url: Option<Url>,
    /// What to do with self-sent envelopes.
    pub self_sent_routing: SelfSentRouting,
    /// Base URL of the QR viewer service.
    pub viewer_url: Option<Url>,
    /// Timeout for viewer and webhook calls.
    pub relay_timeout: Duration,
    /// Restart backoff after failures.
    pub backoff: BackoffConfig,
    /// Delay between a reset and the fresh start it schedules.
    pub reset_restart_delay: Duration,
    /// How many recent message IDs are remembered for dedup.
    pub dedup_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            identity: SessionIdentity::from_string(DEFAULT_IDENTITY),
            session_root: PathBuf::from("./.wwebjs_auth"),
            media_root: PathBuf::from("./tmp/media"),
            public_url: "http://localhost:8080".to_string(),
            webhook_url: None,
            takeover_webhook_url: None,
            self_sent_routing: SelfSentRouting::Takeover,
            viewer_url: None,
            relay_timeout: Duration::from_secs(10),
            backoff: BackoffConfig::default(),
            reset_restart_delay: Duration::from_secs(1),
            dedup_capacity: 512,
        }
    }
}

impl RuntimeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session identity.
    pub fn with_identity(mut self, identity: SessionIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the session storage root.
    pub fn with_session_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.session_root = root.into();
        self
    }

    /// Sets the media root and the public base URL for media links.
    pub fn with_media(mut self, root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        self.media_root = root.into();
        self.public_url = public_url.into();
        self
    }

    /// Sets the primary webhook.
    pub fn with_webhook(mut self, url: Url) -> Self {
        self.webhook_url = Some(url);
        self
    }

    /// Sets the human-takeover webhook.
    pub fn with_takeover_webhook(mut self, url: Option<Url>) -> Self {
        self.takeover_webhook_url = url;
        self
    }

    /// Sets the self-sent routing policy.
    pub fn with_self_sent_routing(mut self, routing: SelfSentRouting) -> Self {
        self.self_sent_routing = routing;
        self
    }

    /// Sets the viewer service base URL.
    pub fn with_viewer(mut self, url: Option<Url>) -> Self {
        self.viewer_url = url;
        self
    }

    /// Sets the timeout for viewer and webhook calls.
    pub fn with_relay_timeout(mut self, timeout: Duration) -> Self {
        self.relay_timeout = timeout;
        self
    }

    /// Sets the restart backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the delay between a reset and its restart.
    pub fn with_reset_restart_delay(mut self, delay: Duration) -> Self {
        self.reset_restart_delay = delay;
        self
    }

    /// Sets how many message IDs dedup remembers.
    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = capacity;
        self
    }
}
