//! Shared types and logic for the AV kiosk assistant.
//!
//! Everything here is pure or file-local: room identifiers, problem
//! classification, the ticket model, analysis outcomes, configuration,
//! the session store and the HTTP API types. Network-facing services
//! live in `kioskd`.

pub mod classify;
pub mod config;
pub mod error;
pub mod outcome;
pub mod room;
pub mod room_info;
pub mod rpc;
pub mod session;
pub mod ticket;

pub use error::KioskError;
pub use room::RoomId;

/// Crate version, shared by daemon and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
