//! Command-line and environment settings.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use relay_api::ApiConfig;
use relay_models::SessionIdentity;
use relay_runtime::{BackoffConfig, RuntimeConfig, SelfSentRouting, DEFAULT_IDENTITY};
use url::Url;

use crate::error::Result;

/// WhatsApp bot relay - bridges a WhatsApp session and workflow webhooks
#[derive(Parser, Debug, Clone)]
#[command(name = "wa-relay", version)]
#[command(about = "Relay WhatsApp messages to workflow webhooks and send replies back")]
pub struct Settings {
    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// HTTP bind host
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Session storage root
    #[arg(long, env = "SESSION_DIR", default_value = "./.wwebjs_auth")]
    pub session_dir: String,

    /// Stable session identity
    #[arg(long, env = "CLIENT_ID", default_value = DEFAULT_IDENTITY)]
    pub client_id: String,

    /// Media artifact root
    #[arg(long, env = "MEDIA_DIR", default_value = "./tmp/media")]
    pub media_dir: String,

    /// Public base URL media links are built from
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:8080")]
    pub public_url: String,

    /// QR viewer service base URL
    #[arg(long, env = "QR_SERVICE_URL")]
    pub qr_service_url: Option<Url>,

    /// Primary inbound webhook
    #[arg(long, env = "N8N_WEBHOOK_URL")]
    pub webhook_url: Url,

    /// Webhook receiving self-sent messages
    #[arg(long, env = "N8N_HUMAN_TAKEOVER_WEBHOOK_URL")]
    pub takeover_webhook_url: Option<Url>,

    /// What to do with self-sent messages: takeover or drop
    #[arg(long, env = "SELF_SENT_ROUTING", default_value = "takeover")]
    pub self_sent_routing: SelfSentRouting,

    /// WhatsApp Web sidecar base URL
    #[arg(long, env = "SIDECAR_URL", default_value = "http://127.0.0.1:21465")]
    pub sidecar_url: Url,

    /// Timeout for sidecar requests, in seconds
    #[arg(long, env = "SIDECAR_TIMEOUT_SECS", default_value_t = 30)]
    pub sidecar_timeout_secs: u64,

    /// Timeout for viewer and webhook calls, in seconds
    #[arg(long, env = "RELAY_TIMEOUT_SECS", default_value_t = 10)]
    pub relay_timeout_secs: u64,

    /// First restart delay after a failure, in milliseconds
    #[arg(long, env = "RESTART_BACKOFF_BASE_MS", default_value_t = 1000)]
    pub restart_backoff_base_ms: u64,

    /// Upper bound for restart delays, in milliseconds
    #[arg(long, env = "RESTART_BACKOFF_MAX_MS", default_value_t = 60_000)]
    pub restart_backoff_max_ms: u64,

    /// Consecutive failures before restarts are logged as errors
    #[arg(long, env = "RESTART_ALERT_AFTER", default_value_t = 5)]
    pub restart_alert_after: u32,

    /// Allowed CORS origins, comma separated
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Extra .env file loaded before settings are read
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Expands `~` and environment variables in a path setting.
fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

impl Settings {
    /// Tracing filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "wa_relay=info,relay_runtime=info,relay_api=info,relay_persistence=info,relay_client=warn",
            1 => "wa_relay=debug,relay_runtime=debug,relay_api=debug,relay_persistence=debug,relay_client=info",
            2 => "wa_relay=trace,relay_runtime=trace,relay_api=trace,relay_persistence=trace,relay_client=debug",
            _ => "trace",
        }
    }

    pub fn media_root(&self) -> PathBuf {
        expand_path(&self.media_dir)
    }

    pub fn session_root(&self) -> PathBuf {
        expand_path(&self.session_dir)
    }

    pub fn sidecar_timeout(&self) -> Duration {
        Duration::from_secs(self.sidecar_timeout_secs)
    }

    /// Builds the runtime configuration. Fails on an invalid identity.
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        let identity = SessionIdentity::new(&self.client_id)?;
        let backoff = BackoffConfig {
            base: Duration::from_millis(self.restart_backoff_base_ms),
            max: Duration::from_millis(self.restart_backoff_max_ms.max(self.restart_backoff_base_ms)),
            alert_after: self.restart_alert_after,
        };

        Ok(RuntimeConfig::new()
            .with_identity(identity)
            .with_session_root(self.session_root())
            .with_media(self.media_root(), self.public_url.trim_end_matches('/'))
            .with_webhook(self.webhook_url.clone())
            .with_takeover_webhook(self.takeover_webhook_url.clone())
            .with_self_sent_routing(self.self_sent_routing)
            .with_viewer(self.qr_service_url.clone())
            .with_relay_timeout(Duration::from_secs(self.relay_timeout_secs))
            .with_backoff(backoff))
    }

    /// Builds the HTTP server configuration.
    pub fn api_config(&self) -> ApiConfig {
        let origins = self
            .cors_origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        ApiConfig::new(&self.host, self.port)
            .with_cors_origins(origins)
            .with_media_root(self.media_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Settings {
        let mut argv = vec!["wa-relay", "--webhook-url", "http://n8n.local/webhook/in"];
        argv.extend_from_slice(args);
        Settings::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]);
        let runtime = settings.runtime_config().unwrap();

        assert_eq!(runtime.identity.as_str(), "bot-principal");
        assert_eq!(runtime.public_url, "http://localhost:8080");
        assert_eq!(runtime.self_sent_routing, SelfSentRouting::Takeover);
        assert_eq!(runtime.relay_timeout, Duration::from_secs(10));
        assert_eq!(runtime.backoff, BackoffConfig::default());
        assert_eq!(
            runtime.webhook_url.unwrap().as_str(),
            "http://n8n.local/webhook/in"
        );

        let api = settings.api_config();
        assert_eq!(api.bind_address(), "0.0.0.0:8080");
        assert!(api.allows_any_origin());
    }

    #[test]
    fn test_overrides() {
        let settings = parse(&[
            "--port",
            "3000",
            "--client-id",
            "shop",
            "--public-url",
            "https://bot.example.com/",
            "--self-sent-routing",
            "drop",
            "--cors-origins",
            "http://qr.local,http://admin.local",
            "--restart-backoff-base-ms",
            "500",
            "-vv",
        ]);
        let runtime = settings.runtime_config().unwrap();

        assert_eq!(runtime.identity.as_str(), "shop");
        assert_eq!(runtime.public_url, "https://bot.example.com");
        assert_eq!(runtime.self_sent_routing, SelfSentRouting::Drop);
        assert_eq!(runtime.backoff.base, Duration::from_millis(500));
        assert_eq!(settings.verbose, 2);
        assert_eq!(
            settings.api_config().cors_origins,
            vec!["http://qr.local", "http://admin.local"]
        );
    }

    #[test]
    fn test_log_filter_covers_every_crate() {
        for verbose in ["", "-v", "-vv"] {
            let args: Vec<&str> = if verbose.is_empty() { vec![] } else { vec![verbose] };
            let filter = parse(&args).log_filter();
            for target in [
                "wa_relay=",
                "relay_runtime=",
                "relay_api=",
                "relay_persistence=",
                "relay_client=",
            ] {
                assert!(filter.contains(target), "{} missing from {}", target, filter);
            }
        }
        assert_eq!(parse(&["-vvv"]).log_filter(), "trace");
    }

    #[test]
    fn test_webhook_is_required() {
        let result = Settings::try_parse_from(["wa-relay"]);
        if std::env::var_os("N8N_WEBHOOK_URL").is_none() {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_invalid_identity() {
        let settings = parse(&["--client-id", "../escape"]);
        assert!(settings.runtime_config().is_err());
    }

    #[test]
    fn test_tilde_paths_expand() {
        if std::env::var_os("HOME").is_none() {
            return;
        }
        let settings = parse(&["--media-dir", "~/relay-media"]);
        let root = settings.media_root();
        assert!(!root.to_string_lossy().starts_with('~'));
        assert!(root.ends_with("relay-media"));
    }
}
