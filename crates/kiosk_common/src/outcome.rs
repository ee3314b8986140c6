//! Terminal outcomes of one problem analysis.
//!
//! Exactly one outcome is emitted per analyze call. Conflict outcomes
//! (`EscalationInProgress`) are ordinary outcomes, not errors, so the
//! presentation layer can inform the user without failure handling.

use crate::classify::ProblemCategory;
use crate::ticket::Ticket;
use serde::{Deserialize, Serialize};

/// Standard greeting answer.
pub const GREETING_MESSAGE: &str =
    "Bonjour ! Comment puis-je vous aider avec vos équipements audiovisuels ?";

/// Answer for chatter the assistant cannot help with.
pub const OUT_OF_SCOPE_MESSAGE: &str =
    "Je suis l'assistant audiovisuel de la salle. Je ne peux pas répondre à cette question.";

/// External service desk a report can be redirected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceDesk {
    /// Building services: heating, plumbing, furniture.
    Building,
    /// IT services: network, workstations, accounts.
    It,
    /// The audiovisual support team tickets are escalated to.
    AvSupport,
}

/// Contact card for a service desk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceContact {
    pub name: &'static str,
    pub phone: &'static str,
    pub website: Option<&'static str>,
}

impl ServiceDesk {
    pub fn contact(&self) -> ServiceContact {
        match self {
            Self::Building => ServiceContact {
                name: "Service des immeubles",
                phone: "6100",
                website: Some("https://immeubles.example.edu/"),
            },
            Self::It => ServiceContact {
                name: "Services informatiques",
                phone: "6200",
                website: Some("https://informatique.example.edu/"),
            },
            Self::AvSupport => ServiceContact {
                name: "Soutien audiovisuel",
                phone: "6135",
                website: None,
            },
        }
    }

    pub fn redirect_message(&self) -> String {
        let contact = self.contact();
        format!(
            "Ce problème relève du {}. Vous pouvez les joindre au poste {}.",
            contact.name, contact.phone
        )
    }
}

/// Why an escalation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// Diagnosis answered but found no automatic fix.
    NoAutomaticFix,
    /// Diagnosis call failed or hit its own timeout.
    DiagnosisFailed,
    /// The escalation timer fired before diagnosis settled.
    TimedOut,
    /// Category escalates without attempting a diagnosis.
    DirectEscalation,
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoAutomaticFix => "no_automatic_fix",
            Self::DiagnosisFailed => "diagnosis_failed",
            Self::TimedOut => "timed_out",
            Self::DirectEscalation => "direct_escalation",
        };
        write!(f, "{}", s)
    }
}

/// Terminal outcome of one analyze call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Polite answer to a salutation, no side effects.
    Greeting { message: String },
    /// The assistant cannot help with this, no side effects.
    OutOfScope { message: String },
    /// Redirected to another service desk, no ticket created.
    Redirected { service: ServiceDesk, message: String },
    /// An automatic fix was executed.
    AutoResolved { message: String },
    /// A ticket was created for the support queue.
    Escalated {
        ticket: Ticket,
        category: ProblemCategory,
        reason: EscalationReason,
    },
    /// A live ticket already covers this room.
    ExistingTicket { ticket: Ticket },
    /// Another escalation holds the single escalation slot.
    EscalationInProgress,
}

impl AnalysisOutcome {
    /// Short tag for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Greeting { .. } => "greeting",
            Self::OutOfScope { .. } => "out_of_scope",
            Self::Redirected { .. } => "redirected",
            Self::AutoResolved { .. } => "auto_resolved",
            Self::Escalated { .. } => "escalated",
            Self::ExistingTicket { .. } => "existing_ticket",
            Self::EscalationInProgress => "escalation_in_progress",
        }
    }
}
