//! Error types for the kiosk assistant.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KioskError {
    #[error("Format de salle invalide (attendu: A-1234): {0}")]
    InvalidRoomFormat(String),

    #[error("Description invalide: entre {min} et {max} caractères attendus")]
    ProblemText { min: usize, max: usize },

    #[error("Aucune salle confirmée pour cette session")]
    NoRoomConfirmed,

    #[error("Une création de ticket est déjà en cours")]
    AlreadyCreating,

    #[error("Création de ticket refusée: {0}")]
    BackendRejected(String),

    #[error("Erreur réseau: {0}")]
    Network(String),

    #[error("Délai d'attente dépassé: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KioskError {
    /// Stable numeric code for the wire.
    pub fn code(&self) -> i32 {
        match self {
            KioskError::InvalidRoomFormat(_) => -33001,
            KioskError::ProblemText { .. } => -33002,
            KioskError::NoRoomConfirmed => -33003,
            KioskError::AlreadyCreating => -33010,
            KioskError::BackendRejected(_) => -33011,
            KioskError::Network(_) => -33020,
            KioskError::Timeout(_) => -33021,
            KioskError::Io(_) => -33030,
            KioskError::Json(_) => -32700,
            KioskError::Internal(_) => -32603,
        }
    }

    /// Validation errors are surfaced immediately and never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            KioskError::InvalidRoomFormat(_)
                | KioskError::ProblemText { .. }
                | KioskError::NoRoomConfirmed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_flagged() {
        assert!(KioskError::InvalidRoomFormat("xx".into()).is_validation());
        assert!(KioskError::ProblemText { min: 10, max: 1000 }.is_validation());
        assert!(!KioskError::Network("down".into()).is_validation());
        assert!(!KioskError::AlreadyCreating.is_validation());
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            KioskError::InvalidRoomFormat(String::new()).code(),
            KioskError::ProblemText { min: 0, max: 0 }.code(),
            KioskError::NoRoomConfirmed.code(),
            KioskError::AlreadyCreating.code(),
            KioskError::BackendRejected(String::new()).code(),
            KioskError::Network(String::new()).code(),
            KioskError::Timeout(String::new()).code(),
        ];
        let mut dedup = codes.to_vec();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), codes.len());
    }
}
