//! Kiosk Daemon - AV assistant decision pipeline
//!
//! Classifies occupant reports, races automatic diagnosis against the
//! escalation timer, and manages session tickets and room metadata.

use anyhow::Result;
use kioskd::backend::HttpBackend;
use kioskd::server::{self, AppState};
use kioskd::sweeper;
use kiosk_common::config::{KioskConfig, CONFIG_PATH};
use kiosk_common::session::SessionStore;
use std::sync::Arc;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Kiosk Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = KioskConfig::load(CONFIG_PATH);
    let session = SessionStore::at_default_path();
    info!("Session file: {}", session.path().display());

    let backend = Arc::new(HttpBackend::new(config.api.clone(), &config.timeouts));
    let state = AppState::new(config.clone(), backend, session);

    tokio::spawn(sweeper::run(
        state.cache.clone(),
        state.tickets.clone(),
        config.cache.sweep_interval(),
    ));

    info!("Kiosk Daemon ready");
    server::run(state).await
}
