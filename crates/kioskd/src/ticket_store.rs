//! Session ticket store.
//!
//! Guarantees at most one live ticket per room: a creation request for
//! a room that already has a live ticket returns the existing ticket
//! instead of creating a duplicate. A try-lock creation slot rejects
//! concurrent creations outright rather than queueing them.

use crate::backend::{enrichment_from_payload, CreateTicketRequest, SupportBackend};
use crate::room_cache::RoomCache;
use chrono::Utc;
use kiosk_common::room_info::RoomInfoSource;
use kiosk_common::session::SessionStore;
use kiosk_common::ticket::{generate_id, generate_ticket_number, Ticket, TicketRequest};
use kiosk_common::{KioskError, RoomId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// What a creation call produced.
#[derive(Debug, Clone)]
pub enum CreateResult {
    /// A new ticket was created on the backend.
    Created(Ticket),
    /// A live ticket already covered the room; no backend call made.
    Existing(Ticket),
}

impl CreateResult {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Self::Created(t) | Self::Existing(t) => t,
        }
    }
}

pub struct TicketStore {
    backend: Arc<dyn SupportBackend>,
    cache: Arc<RoomCache>,
    store: SessionStore,
    /// Keyed by ticket number (or id when the backend gave no number).
    tickets: RwLock<HashMap<String, Ticket>>,
    /// Try-locked, never awaited: a busy slot is an immediate rejection.
    create_slot: Mutex<()>,
}

impl TicketStore {
    pub fn new(
        backend: Arc<dyn SupportBackend>,
        cache: Arc<RoomCache>,
        store: SessionStore,
    ) -> Self {
        let seeded = store.load().session_tickets;
        if !seeded.is_empty() {
            info!("Seeded ticket store with {} persisted tickets", seeded.len());
        }
        Self {
            backend,
            cache,
            store,
            tickets: RwLock::new(seeded),
            create_slot: Mutex::new(()),
        }
    }

    /// The most recent live ticket for a room, if any.
    pub async fn live_for_room(&self, room: &RoomId) -> Option<Ticket> {
        let now = Utc::now();
        self.tickets
            .read()
            .await
            .values()
            .filter(|t| t.room == *room && t.is_live(now))
            .max_by_key(|t| t.created_at)
            .cloned()
    }

    /// Create a ticket for the request, deduplicating per room.
    ///
    /// Fails with `AlreadyCreating` when another creation holds the
    /// slot, and with `BackendRejected`/`Network`/`Timeout` when the
    /// backend does not produce a ticket.
    pub async fn create(&self, req: &TicketRequest) -> Result<CreateResult, KioskError> {
        let _slot = self
            .create_slot
            .try_lock()
            .map_err(|_| KioskError::AlreadyCreating)?;

        self.sweep_expired().await;

        // Dedup check under the slot so two sequential calls for the
        // same room cannot both reach the backend.
        if let Some(existing) = self.live_for_room(&req.room).await {
            info!(
                "Room {} already has live ticket {}",
                req.room, existing.number
            );
            return Ok(CreateResult::Existing(existing));
        }

        let ticket = self.create_on_backend(req).await?;
        info!("Created ticket {} for room {}", ticket.number, ticket.room);

        let key = ticket.number.clone();
        self.tickets
            .write()
            .await
            .insert(key.clone(), ticket.clone());

        let persisted = ticket.clone();
        if let Err(e) = self.store.update(move |data| {
            data.session_tickets.insert(key, persisted);
        }) {
            warn!("Failed to persist ticket: {}", e);
        }

        Ok(CreateResult::Created(ticket))
    }

    async fn create_on_backend(&self, req: &TicketRequest) -> Result<Ticket, KioskError> {
        // Enrich from cached primary metadata when we have it. A miss
        // or a degraded record just means fewer fields on the ticket.
        let record = self.cache.lookup(&req.room, false).await;
        let (building, zone, room_type, capacity) = if record.source == RoomInfoSource::Primary {
            enrichment_from_payload(&record.payload)
        } else {
            (None, None, None, None)
        };

        let backend_req = CreateTicketRequest {
            room: req.room.clone(),
            title: req.title(),
            description: req.body(),
            client_message: req.client_message(),
            priority: req.priority,
            session_id: self.store.ensure_session_id(),
            timestamp: Utc::now(),
            building,
            zone,
            room_type,
            capacity,
        };

        let response = self.backend.create_ticket(&backend_req).await?;
        if !response.success {
            return Err(KioskError::BackendRejected(
                response
                    .message
                    .unwrap_or_else(|| "aucun détail fourni".to_string()),
            ));
        }
        let reported = response.ticket.ok_or_else(|| {
            KioskError::BackendRejected("réponse sans ticket".to_string())
        })?;

        let now = Utc::now();
        Ok(Ticket {
            id: reported.id.unwrap_or_else(generate_id),
            number: reported
                .number
                .unwrap_or_else(|| generate_ticket_number(now)),
            room: req.room.clone(),
            title: backend_req.title,
            description: backend_req.description,
            status: reported.status.unwrap_or_else(|| "created".to_string()),
            priority: req.priority,
            created_at: now,
            session_id: backend_req.session_id,
        })
    }

    /// All live tickets, newest first.
    pub async fn live_tickets(&self) -> Vec<Ticket> {
        let now = Utc::now();
        let mut tickets: Vec<Ticket> = self
            .tickets
            .read()
            .await
            .values()
            .filter(|t| t.is_live(now))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tickets
    }

    pub async fn live_count(&self) -> usize {
        let now = Utc::now();
        self.tickets
            .read()
            .await
            .values()
            .filter(|t| t.is_live(now))
            .count()
    }

    /// Drop expired tickets. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut tickets = self.tickets.write().await;
        let before = tickets.len();
        tickets.retain(|_, t| t.is_live(now));
        let dropped = before - tickets.len();
        drop(tickets);

        if dropped > 0 {
            info!("Swept {} expired tickets", dropped);
            if let Err(e) = self.store.update(|data| {
                data.session_tickets.retain(|_, t| t.is_live(now));
            }) {
                warn!("Failed to persist ticket sweep: {}", e);
            }
        }
        dropped
    }
}
