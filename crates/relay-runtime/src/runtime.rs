//! Main runtime manager.

use std::sync::Arc;

use relay_client::{ClientFactory, GenerationEvent};
use relay_persistence::MediaStore;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::dedup::RecentIds;
use crate::dispatcher::OutboundDispatcher;
use crate::error::{Result, RuntimeError};
use crate::normalizer::{drop_reason, InboundNormalizer};
use crate::relay::{RelayRouter, RelayTarget};
use crate::supervisor::ConnectionSupervisor;
use crate::viewer::ViewerNotifier;

/// Consumes client events one at a time, in delivery order.
///
/// Each message event runs to completion (filters, dedup, normalization,
/// webhook delivery) before the next event is looked at.
pub struct InboundPipeline {
    supervisor: Arc<ConnectionSupervisor>,
    events: mpsc::UnboundedReceiver<GenerationEvent>,
    normalizer: InboundNormalizer,
    router: RelayRouter,
    recent: RecentIds,
}

impl InboundPipeline {
    /// Runs until the shutdown signal or until every sender is gone.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        debug!("starting inbound pipeline");

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(event) => {
                            self.process(event).await;
                        }
                        None => break,
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("pipeline received shutdown signal");
                        break;
                    }
                }
            }
        }

        debug!("inbound pipeline stopped");
    }

    /// Handles one event. Returns where the resulting envelope was relayed.
    pub async fn process(&mut self, event: GenerationEvent) -> Option<RelayTarget> {
        let message = self.supervisor.handle_event(event).await?;

        if let Some(reason) = drop_reason(&message, self.supervisor.is_connected()) {
            debug!(message_id = %message.id, reason = %reason, "message dropped");
            return None;
        }
        if !self.recent.insert(&message.id) {
            debug!(message_id = %message.id, "duplicate message dropped");
            return None;
        }

        let client = self.supervisor.client().await?;
        let envelope = self.normalizer.build(&message, client.as_ref()).await;
        self.router.deliver(&envelope).await
    }
}

/// Main runtime combining the supervisor, the inbound pipeline and the
/// outbound dispatcher.
pub struct Runtime {
    config: RuntimeConfig,
    supervisor: Arc<ConnectionSupervisor>,
    dispatcher: OutboundDispatcher,
    /// Moved into its task on start.
    pipeline: Option<InboundPipeline>,
    pipeline_handle: Option<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    started: bool,
}

impl Runtime {
    /// Wires the runtime around a client factory.
    pub fn new(config: RuntimeConfig, factory: Arc<dyn ClientFactory>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.relay_timeout)
            .build()
            .map_err(|e| RuntimeError::Http(e.to_string()))?;

        let viewer = ViewerNotifier::new(http.clone(), config.viewer_url.clone());
        let (supervisor, events) = ConnectionSupervisor::new(&config, factory, viewer);

        let pipeline = InboundPipeline {
            supervisor: Arc::clone(&supervisor),
            events,
            normalizer: InboundNormalizer::new(MediaStore::new(
                &config.media_root,
                &config.public_url,
            )),
            router: RelayRouter::new(
                http,
                config.webhook_url.clone(),
                config.takeover_webhook_url.clone(),
                config.self_sent_routing,
            ),
            recent: RecentIds::new(config.dedup_capacity),
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            dispatcher: OutboundDispatcher::new(Arc::clone(&supervisor)),
            supervisor,
            pipeline: Some(pipeline),
            pipeline_handle: None,
            shutdown_tx,
            shutdown_rx,
            started: false,
            config,
        })
    }

    /// Prepares storage, starts the pipeline and the first client instance.
    ///
    /// Stale session directories of other identities are removed first. A
    /// failing first start is not an error: the supervisor keeps retrying.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(RuntimeError::AlreadyStarted);
        }
        let pipeline = self.pipeline.take().ok_or(RuntimeError::Stopped)?;

        info!(identity = %self.config.identity, "starting runtime");

        let removed = self.supervisor.sessions().sweep_stale(&self.config.identity)?;
        if !removed.is_empty() {
            info!(count = removed.len(), "removed stale session directories");
        }
        MediaStore::new(&self.config.media_root, &self.config.public_url).ensure_root()?;

        let shutdown_rx = self.shutdown_rx.clone();
        self.pipeline_handle = Some(tokio::spawn(pipeline.run(shutdown_rx)));
        self.started = true;

        if let Err(e) = self.supervisor.start().await {
            warn!(error = %e, "initial client start failed, retry scheduled");
        }

        debug!("runtime started");
        Ok(())
    }

    /// Stops the pipeline and tears the client down.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.started {
            return Err(RuntimeError::NotStarted);
        }

        info!("shutting down runtime");

        self.shutdown_tx.send(true).map_err(|e| {
            RuntimeError::Shutdown(format!("failed to send shutdown signal: {}", e))
        })?;

        if let Some(handle) = self.pipeline_handle.take() {
            debug!("waiting for pipeline to stop");
            handle
                .await
                .map_err(|e| RuntimeError::Shutdown(format!("pipeline task panicked: {}", e)))?;
        }

        self.supervisor.shutdown().await;
        self.started = false;

        info!("runtime stopped");
        Ok(())
    }

    /// The connection supervisor.
    pub fn supervisor(&self) -> Arc<ConnectionSupervisor> {
        Arc::clone(&self.supervisor)
    }

    /// The outbound dispatcher.
    pub fn dispatcher(&self) -> OutboundDispatcher {
        self.dispatcher.clone()
    }

    /// The configuration the runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Check if the runtime has been started.
    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if self.started {
            let _ = self.shutdown_tx.send(true);
        }
    }
}
