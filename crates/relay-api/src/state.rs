//! Application state shared across handlers.

use std::sync::Arc;

use relay_runtime::{ConnectionSupervisor, OutboundDispatcher, Runtime};

use crate::config::ApiConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Owner of the live client instance.
    pub supervisor: Arc<ConnectionSupervisor>,
    /// Outbound sends and chat states.
    pub dispatcher: OutboundDispatcher,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        supervisor: Arc<ConnectionSupervisor>,
        dispatcher: OutboundDispatcher,
    ) -> Self {
        Self {
            config: Arc::new(config),
            supervisor,
            dispatcher,
        }
    }

    /// Builds the state from a runtime's supervisor and dispatcher.
    pub fn from_runtime(config: ApiConfig, runtime: &Runtime) -> Self {
        Self::new(config, runtime.supervisor(), runtime.dispatcher())
    }
}
