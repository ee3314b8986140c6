//! HTTP server for kioskd

use crate::backend::SupportBackend;
use crate::escalation::EscalationController;
use crate::room_cache::RoomCache;
use crate::routes;
use crate::ticket_store::TicketStore;
use anyhow::Result;
use axum::Router;
use kiosk_common::config::KioskConfig;
use kiosk_common::session::SessionStore;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub config: KioskConfig,
    pub session: SessionStore,
    pub cache: Arc<RoomCache>,
    pub tickets: Arc<TicketStore>,
    pub controller: EscalationController,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the full pipeline on top of one backend implementation.
    pub fn new(
        config: KioskConfig,
        backend: Arc<dyn SupportBackend>,
        session: SessionStore,
    ) -> Self {
        let cache = Arc::new(RoomCache::new(backend.clone(), session.clone()));
        let tickets = Arc::new(TicketStore::new(
            backend.clone(),
            cache.clone(),
            session.clone(),
        ));
        let controller =
            EscalationController::new(backend, tickets.clone(), &config.timeouts);
        Self {
            config,
            session,
            cache,
            tickets,
            controller,
            start_time: Instant::now(),
        }
    }
}

/// Run the HTTP server
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.server.listen_addr.clone();
    let state = Arc::new(state);

    let app = Router::new()
        .merge(routes::analysis_routes())
        .merge(routes::room_routes())
        .merge(routes::ticket_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Bind to localhost only; the kiosk UI runs on the same machine.
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
