//! Support tickets created for a room during the current session.
//!
//! A ticket is "live" while younger than the 24h expiry window; at most
//! one live ticket per room is retained for deduplication.

use crate::classify::ProblemCategory;
use crate::room::RoomId;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default expiry window for session tickets.
pub const TICKET_TTL_HOURS: i64 = 24;

/// Ticket priority sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A support ticket as stored in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Opaque id (backend-provided, locally generated otherwise).
    pub id: String,
    /// Human-facing ticket number, e.g. `SEA-20260829-0042`.
    pub number: String,
    pub room: RoomId,
    pub title: String,
    pub description: String,
    /// Backend-owned status string; "created" when the backend stays silent.
    pub status: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    /// Session that created the ticket.
    pub session_id: String,
}

impl Ticket {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// A ticket past the expiry window is logically absent.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > Duration::hours(TICKET_TTL_HOURS)
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
    }
}

/// Input for creating a ticket. Text generation below is deterministic
/// in the category, room and optional user description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRequest {
    pub room: RoomId,
    pub category: ProblemCategory,
    /// Sanitized free-text description from the user, may be empty.
    pub description: String,
    pub priority: Priority,
}

impl TicketRequest {
    pub fn new(room: RoomId, category: ProblemCategory, description: &str) -> Self {
        Self {
            room,
            category,
            description: sanitize_description(description),
            priority: Priority::Medium,
        }
    }

    /// Ticket title shown to the support team.
    pub fn title(&self) -> String {
        format!(
            "Problème {} signalé via la borne - Salle {}",
            self.category.label(),
            self.room
        )
    }

    /// Full ticket body.
    pub fn body(&self) -> String {
        let base = format!(
            "Problème {} signalé par un occupant via la borne d'assistance, \
             intervention technique requise.",
            self.category.label()
        );
        if self.description.trim().is_empty() {
            base
        } else {
            format!("{}\n\nDescription : {}", base, self.description)
        }
    }

    /// Message echoing what the occupant reported. Falls back to a
    /// generic per-category message when the description is too short
    /// to be meaningful.
    pub fn client_message(&self) -> String {
        let trimmed = self.description.trim();
        if trimmed.len() > 20 {
            format!("Signalement via la borne d'assistance\n\nDescription : {}", trimmed)
        } else {
            format!(
                "Signalement via la borne d'assistance\n\nMessage générique : {}",
                generic_message(self.category)
            )
        }
    }
}

fn generic_message(category: ProblemCategory) -> &'static str {
    match category {
        ProblemCategory::Video => "Problème vidéo signalé - aucun affichage ou image déformée",
        ProblemCategory::Audio => "Problème audio signalé - aucun son ou qualité dégradée",
        ProblemCategory::Network => "Problème réseau signalé - connexion défaillante",
        _ => "Problème technique signalé nécessitant intervention",
    }
}

/// Strip characters that have no place in a ticket body.
pub fn sanitize_description(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect()
}

/// Locally generated ticket number for backends that do not assign one.
pub fn generate_ticket_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("SEA-{}-{:04}", now.format("%Y%m%d"), suffix)
}

/// Opaque local id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
