//! Request and response types for the daemon's HTTP API.
//!
//! This is the boundary the presentation layer (kiosk web UI, CLI)
//! talks to. Room strings arrive raw here and are validated before
//! entering the core.

use crate::classify::ProblemClassification;
use crate::outcome::AnalysisOutcome;
use crate::room::RoomId;
use crate::room_info::RoomInfoRecord;
use crate::ticket::Ticket;
use serde::{Deserialize, Serialize};

/// POST /v1/analyze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Raw room string; validated and normalized server-side.
    pub room: String,
    /// Free-text problem report.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub outcome: AnalysisOutcome,
    /// Observability only; nothing downstream thresholds on it.
    pub classification: ProblemClassification,
}

/// POST /v1/room/confirm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRoomRequest {
    pub room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRoomResponse {
    pub room: RoomId,
    pub info: RoomInfoRecord,
}

/// GET /v1/room/info query parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfoQuery {
    pub room: String,
    #[serde(default)]
    pub force_refresh: bool,
}

/// GET /v1/tickets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketsResponse {
    pub tickets: Vec<Ticket>,
}

/// GET /v1/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub cached_rooms: usize,
    pub live_tickets: usize,
    pub escalating: bool,
    pub last_room: Option<RoomId>,
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
}

impl ErrorResponse {
    pub fn from_error(err: &crate::error::KioskError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}
