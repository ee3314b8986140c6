//! Periodic expiry sweep.
//!
//! Expiry is enforced lazily at read time; this loop just keeps the
//! resident maps and the session file from accumulating dead records.

use crate::room_cache::RoomCache;
use crate::ticket_store::TicketStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Run the sweep loop forever. Spawned as a background task.
pub async fn run(cache: Arc<RoomCache>, tickets: Arc<TicketStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it, the maps are fresh.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let rooms = cache.sweep_expired().await;
        let swept = tickets.sweep_expired().await;
        debug!("Sweep done: {} room records, {} tickets", rooms, swept);
    }
}
