//! Kiosk assistant daemon.
//!
//! Decision pipeline behind the room kiosk: classify the occupant's
//! report, race an automatic diagnosis against the escalation timer,
//! and create support tickets with per-room deduplication. Room
//! metadata is cached with primary/fallback sourcing.

pub mod backend;
pub mod escalation;
pub mod room_cache;
pub mod routes;
pub mod server;
pub mod sweeper;
pub mod ticket_store;
