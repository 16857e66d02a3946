//! WhatsApp relay binary.
//!
//! Start the relay with:
//! ```bash
//! N8N_WEBHOOK_URL=http://localhost:5678/webhook/whatsapp cargo run -p wa-relay
//! ```

use std::sync::Arc;

use clap::Parser;
use relay_api::{serve_with_shutdown, AppState};
use relay_client::SidecarFactory;
use relay_runtime::Runtime;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use wa_relay::{Result, Settings};

fn load_settings() -> Settings {
    // .env values only fill in what the real environment leaves unset.
    let _ = dotenvy::dotenv();
    let settings = Settings::parse();
    match &settings.env_file {
        Some(path) => {
            if let Err(e) = dotenvy::from_path(path) {
                eprintln!("warning: could not load {}: {}", path.display(), e);
            }
            Settings::parse()
        }
        None => settings,
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(settings).await {
        tracing::error!(error = %e, "relay stopped with an error");
        return Err(e.into());
    }
    Ok(())
}

async fn run(settings: Settings) -> Result<()> {
    let factory = SidecarFactory::new(settings.sidecar_url.clone(), settings.sidecar_timeout())?;
    let config = settings.runtime_config()?;

    tracing::info!(
        identity = %config.identity,
        sidecar = %factory.base_url(),
        webhook = ?config.webhook_url.as_ref().map(|u| u.as_str()),
        "starting WhatsApp relay"
    );

    let mut runtime = Runtime::new(config, Arc::new(factory))?;
    runtime.start().await?;

    let api_config = settings.api_config();
    let state = AppState::from_runtime(api_config.clone(), &runtime);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(serve_with_shutdown(api_config, state, async move {
        let _ = stop_rx.await;
    }));

    println!("\nWhatsApp relay running on port {}", settings.port);
    println!("   Press Ctrl+C to stop\n");

    // The server only finishes on its own when it failed.
    let early = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            }
            tracing::info!("shutdown requested");
            None
        }
        served = &mut server => Some(served),
    };

    let _ = stop_tx.send(());
    let served = match early {
        Some(served) => served,
        None => server.await,
    };
    runtime.shutdown().await?;

    match served {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }
    Ok(())
}
