//! API routes for kioskd.
//!
//! The presentation layer on the kiosk talks to these endpoints over
//! localhost. Validation of raw input (room format, problem-text
//! bounds) happens here, before anything enters the pipeline.

use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use kiosk_common::rpc::{
    AnalyzeRequest, AnalyzeResponse, ConfirmRoomRequest, ConfirmRoomResponse, ErrorResponse,
    HealthResponse, RoomInfoQuery, TicketsResponse,
};
use kiosk_common::{KioskError, RoomId};
use std::sync::Arc;
use tracing::{error, info};

type AppStateArc = Arc<AppState>;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reject(err: KioskError) -> ApiError {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        match err {
            KioskError::AlreadyCreating => StatusCode::CONFLICT,
            KioskError::BackendRejected(_) | KioskError::Network(_) => StatusCode::BAD_GATEWAY,
            KioskError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    };
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    (status, Json(ErrorResponse::from_error(&err)))
}

// ============================================================================
// Analysis Routes
// ============================================================================

pub fn analysis_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/analyze", post(analyze))
}

async fn analyze(
    State(state): State<AppStateArc>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let room = RoomId::parse(&req.room).map_err(reject)?;
    validate_problem_text(&state, &req.message).map_err(reject)?;

    let mentioned = room.conflicts_in_text(&req.message);
    if !mentioned.is_empty() {
        tracing::warn!(
            "Report for {} mentions other rooms: {:?}",
            room,
            mentioned
        );
    }

    info!("Analyzing report for room {}", room);
    let report = state
        .controller
        .analyze(&room, req.message.trim())
        .await
        .map_err(reject)?;

    remember_room(&state, &room);

    Ok(Json(AnalyzeResponse {
        outcome: report.outcome,
        classification: report.classification,
    }))
}

/// Bounds are counted in characters after trimming, not bytes; the
/// kiosk UI is French and accented text is the norm.
fn validate_problem_text(state: &AppState, message: &str) -> Result<(), KioskError> {
    let len = message.trim().chars().count();
    let bounds = &state.config.validation;
    if len < bounds.min_problem_chars || len > bounds.max_problem_chars {
        return Err(KioskError::ProblemText {
            min: bounds.min_problem_chars,
            max: bounds.max_problem_chars,
        });
    }
    Ok(())
}

// ============================================================================
// Room Routes
// ============================================================================

pub fn room_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/room/confirm", post(confirm_room))
        .route("/v1/room/info", get(room_info))
}

async fn confirm_room(
    State(state): State<AppStateArc>,
    Json(req): Json<ConfirmRoomRequest>,
) -> Result<Json<ConfirmRoomResponse>, ApiError> {
    let room = RoomId::parse(&req.room).map_err(reject)?;
    info!("Confirming room {}", room);

    let info = state.cache.lookup(&room, false).await;
    remember_room(&state, &room);

    Ok(Json(ConfirmRoomResponse { room, info }))
}

async fn room_info(
    State(state): State<AppStateArc>,
    Query(query): Query<RoomInfoQuery>,
) -> Result<Json<kiosk_common::room_info::RoomInfoRecord>, ApiError> {
    let room = RoomId::parse(&query.room).map_err(reject)?;
    let record = state.cache.lookup(&room, query.force_refresh).await;
    Ok(Json(record))
}

// ============================================================================
// Ticket Routes
// ============================================================================

pub fn ticket_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/tickets", get(list_tickets))
}

async fn list_tickets(State(state): State<AppStateArc>) -> Json<TicketsResponse> {
    Json(TicketsResponse {
        tickets: state.tickets.live_tickets().await,
    })
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        version: kiosk_common::VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        cached_rooms: state.cache.cached_count().await,
        live_tickets: state.tickets.live_count().await,
        escalating: state.controller.is_escalating(),
        last_room: state.session.load().last_room,
    })
}

fn remember_room(state: &AppState, room: &RoomId) {
    let room = room.clone();
    if let Err(e) = state.session.update(move |data| {
        data.last_room = Some(room);
    }) {
        tracing::warn!("Failed to persist last room: {}", e);
    }
}
