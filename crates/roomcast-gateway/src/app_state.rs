//! Shared application state for the roomcast gateway.
//!
//! Owns the relay core and the external collaborators (auth gateway, history
//! log). Both collaborators sit behind trait objects and are injected here —
//! nothing in the relay reaches for them as ambient globals, and tests swap
//! in their own implementations.

use std::sync::Arc;

use crate::auth::{AuthGateway, JwtAuth};
use crate::config::RelayConfig;
use crate::history::{HistoryLog, InMemoryHistory};
use crate::obs::RelayMetrics;
use crate::realtime::RelayCore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: RelayConfig,
    relay: Arc<RelayCore>,
    auth: Arc<dyn AuthGateway>,
    history: Arc<dyn HistoryLog>,
    metrics: Arc<RelayMetrics>,
}

impl AppState {
    /// Build application state with the default collaborators: HS256 JWT auth
    /// from the configured secret, in-memory history.
    pub fn new(cfg: RelayConfig) -> Self {
        let auth: Arc<dyn AuthGateway> =
            Arc::new(JwtAuth::new(&cfg.auth.secret, cfg.auth.token_ttl_hours));
        let history: Arc<dyn HistoryLog> =
            Arc::new(InMemoryHistory::new(cfg.history.max_room_entries));
        Self::with_collaborators(cfg, auth, history)
    }

    /// Build application state with injected collaborators (tests,
    /// alternative backends).
    pub fn with_collaborators(
        cfg: RelayConfig,
        auth: Arc<dyn AuthGateway>,
        history: Arc<dyn HistoryLog>,
    ) -> Self {
        let metrics = Arc::new(RelayMetrics::default());
        let relay = Arc::new(RelayCore::new(Arc::clone(&metrics)));
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                relay,
                auth,
                history,
                metrics,
            }),
        }
    }

    pub fn cfg(&self) -> &RelayConfig {
        &self.inner.cfg
    }

    pub fn relay(&self) -> Arc<RelayCore> {
        Arc::clone(&self.inner.relay)
    }

    pub fn auth(&self) -> Arc<dyn AuthGateway> {
        Arc::clone(&self.inner.auth)
    }

    pub fn history(&self) -> Arc<dyn HistoryLog> {
        Arc::clone(&self.inner.history)
    }

    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
