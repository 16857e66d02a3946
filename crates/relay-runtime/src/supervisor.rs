//! Connection supervisor: owns the single live client instance.

use std::sync::Arc;
use std::time::Duration;

use relay_client::{ClientFactory, EventSink, GenerationEvent, RawMessage, WhatsAppClient};
use relay_models::{SessionIdentity, SessionStatus};
use relay_persistence::SessionStore;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::qr::render_qr;
use crate::state::{transition, Action};
use crate::viewer::ViewerNotifier;

struct Inner {
    client: Option<Arc<dyn WhatsAppClient>>,
    /// Set from start until ready or failure; a second start is a no-op.
    initializing: bool,
    /// Bumped on every start and teardown. Events and scheduled restarts
    /// carrying an older value are ignored.
    generation: u64,
    backoff: Backoff,
    stopped: bool,
}

/// Owns the lifecycle of exactly one client instance at a time.
///
/// Status changes are driven by [`handle_event`](Self::handle_event) and can
/// be observed through [`subscribe`](Self::subscribe). Failures tear the
/// instance down and restart it after a capped exponential backoff, forever.
pub struct ConnectionSupervisor {
    identity: SessionIdentity,
    sessions: SessionStore,
    factory: Arc<dyn ClientFactory>,
    viewer: ViewerNotifier,
    events: mpsc::UnboundedSender<GenerationEvent>,
    status: watch::Sender<SessionStatus>,
    /// QR payload waiting to be scanned.
    qr: watch::Sender<Option<String>>,
    reset_restart_delay: Duration,
    inner: Mutex<Inner>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor and the receiver its client instances emit into.
    pub fn new(
        config: &RuntimeConfig,
        factory: Arc<dyn ClientFactory>,
        viewer: ViewerNotifier,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<GenerationEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SessionStatus::Uninitialized);
        let (qr, _) = watch::channel(None);

        let supervisor = Self {
            identity: config.identity.clone(),
            sessions: SessionStore::new(&config.session_root),
            factory,
            viewer,
            events,
            status,
            qr,
            reset_restart_delay: config.reset_restart_delay,
            inner: Mutex::new(Inner {
                client: None,
                initializing: false,
                generation: 0,
                backoff: Backoff::new(config.backoff),
                stopped: false,
            }),
        };
        (Arc::new(supervisor), rx)
    }

    /// The session identity.
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// The session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// True only while the status is `CONNECTED`.
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Watches status changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// The QR payload of the current instance, until it is scanned.
    pub fn pending_qr(&self) -> Option<String> {
        self.qr.borrow().clone()
    }

    /// The live client instance, if any.
    pub async fn client(&self) -> Option<Arc<dyn WhatsAppClient>> {
        self.inner.lock().await.client.clone()
    }

    /// The live client instance, only when connected.
    pub async fn connected_client(&self) -> Option<Arc<dyn WhatsAppClient>> {
        if !self.is_connected() {
            return None;
        }
        self.client().await
    }

    fn set_status(&self, next: SessionStatus) {
        let previous = self.status.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "session status changed");
        }
    }

    /// Starts a client instance. Returns true when a new instance was
    /// launched.
    ///
    /// No-op while an instance is initializing or live. A failed start is
    /// retried after backoff.
    pub async fn start(self: &Arc<Self>) -> Result<bool> {
        self.start_checked(None).await
    }

    async fn start_checked(self: &Arc<Self>, expected_generation: Option<u64>) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if inner.stopped {
            return Err(RuntimeError::Stopped);
        }
        if let Some(expected) = expected_generation {
            if inner.generation != expected {
                debug!(expected, current = inner.generation, "superseded restart skipped");
                return Ok(false);
            }
        }
        if inner.initializing || inner.client.is_some() {
            debug!(
                initializing = inner.initializing,
                "client already live, start ignored"
            );
            return Ok(false);
        }

        inner.initializing = true;
        inner.generation += 1;
        let generation = inner.generation;
        info!(identity = %self.identity, generation, "starting client");

        let result = self.launch(&mut inner, generation).await;
        if let Err(e) = &result {
            error!(identity = %self.identity, error = %e, "client start failed");
            self.teardown(&mut inner).await;
            let delay = self.next_backoff(&mut inner);
            let generation = inner.generation;
            drop(inner);
            self.schedule_start(delay, generation);
        }
        result.map(|()| true)
    }

    async fn launch(&self, inner: &mut Inner, generation: u64) -> Result<()> {
        let data_dir = self.sessions.create(&self.identity)?;
        let sink = EventSink::new(generation, self.events.clone());
        let client = self.factory.create(&self.identity, &data_dir, sink).await?;
        inner.client = Some(Arc::clone(&client));
        client.connect().await?;
        Ok(())
    }

    /// Destroys the live instance (if any) and invalidates its events.
    async fn teardown(&self, inner: &mut Inner) {
        self.qr.send_replace(None);
        inner.initializing = false;
        inner.generation += 1;
        if let Some(client) = inner.client.take() {
            debug!(identity = %self.identity, "destroying client instance");
            if let Err(e) = client.destroy().await {
                warn!(identity = %self.identity, error = %e, "client destroy failed");
            }
        }
    }

    fn next_backoff(&self, inner: &mut Inner) -> Duration {
        let delay = inner.backoff.next_delay();
        let failures = inner.backoff.failures();
        if inner.backoff.should_alert() {
            error!(
                identity = %self.identity,
                failures,
                delay_ms = delay.as_millis() as u64,
                "client keeps failing, still retrying"
            );
        } else {
            warn!(
                identity = %self.identity,
                failures,
                delay_ms = delay.as_millis() as u64,
                "scheduling client restart"
            );
        }
        delay
    }

    /// Starts again after `delay`, unless something else started or tore
    /// down the client in the meantime.
    fn schedule_start(self: &Arc<Self>, delay: Duration, generation: u64) {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match supervisor.start_checked(Some(generation)).await {
                Ok(_) => {}
                Err(RuntimeError::Stopped) => debug!("supervisor stopped, restart dropped"),
                Err(e) => debug!(error = %e, "scheduled start failed"),
            }
        });
    }

    /// Applies one client event.
    ///
    /// Returns the message when the event is a chat message that should go
    /// through the inbound pipeline.
    pub async fn handle_event(self: &Arc<Self>, event: GenerationEvent) -> Option<RawMessage> {
        let mut inner = self.inner.lock().await;
        if event.generation != inner.generation {
            debug!(
                event = event.event.name(),
                event_generation = event.generation,
                current = inner.generation,
                "ignoring event from stale client instance"
            );
            return None;
        }

        let step = transition(self.status(), event.event);
        self.set_status(step.next);

        match step.action {
            Action::None => None,
            Action::ShowQr(qr) => {
                drop(inner);
                match render_qr(&qr) {
                    Some(rendered) => {
                        info!("QR code received, scan it with WhatsApp to log in:\n{}", rendered)
                    }
                    None => warn!(qr = %qr, "QR code received but could not be rendered"),
                }
                self.qr.send_replace(Some(qr.clone()));
                self.viewer.qr(&qr).await;
                None
            }
            Action::Ready => {
                self.qr.send_replace(None);
                inner.initializing = false;
                inner.backoff.reset();
                drop(inner);
                info!(identity = %self.identity, "client ready");
                self.viewer.connected().await;
                None
            }
            Action::Restart { reason } => {
                warn!(identity = %self.identity, reason = %reason, "client lost, restarting");
                self.teardown(&mut inner).await;
                let delay = self.next_backoff(&mut inner);
                let generation = inner.generation;
                drop(inner);
                self.viewer.disconnected().await;
                self.schedule_start(delay, generation);
                None
            }
            Action::TakeOver => {
                let client = inner.client.clone();
                drop(inner);
                if let Some(client) = client {
                    info!("session opened elsewhere, taking it over");
                    if let Err(e) = client.take_over().await {
                        warn!(error = %e, "take over failed");
                    }
                }
                None
            }
            Action::Relay(message) => Some(message),
        }
    }

    /// Tears the instance down, deletes the persisted session and schedules
    /// a fresh start. Safe to call with no live instance.
    pub async fn reset(self: &Arc<Self>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.stopped {
            return Err(RuntimeError::Stopped);
        }

        info!(identity = %self.identity, "resetting session");
        self.teardown(&mut inner).await;
        inner.backoff.reset();
        self.set_status(SessionStatus::Uninitialized);
        let removed = self.sessions.destroy(&self.identity);
        let generation = inner.generation;
        drop(inner);

        self.schedule_start(self.reset_restart_delay, generation);
        removed?;
        Ok(())
    }

    /// Starts a client unless already connected. Returns true only when a
    /// new instance was launched.
    pub async fn request_qr(self: &Arc<Self>) -> Result<bool> {
        if self.is_connected() {
            debug!("QR requested while connected");
            return Ok(false);
        }
        self.start().await
    }

    /// Stops for good: tears the instance down and refuses further starts.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.stopped = true;
        self.teardown(&mut inner).await;
        info!(identity = %self.identity, "supervisor stopped");
    }
}
